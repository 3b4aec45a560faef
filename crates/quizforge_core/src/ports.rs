//! crates/quizforge_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, object
//! stores or LLM APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AnswerSubmission, BloomLevel, Document, ExtractedText, FileFormat, GeneratedQuestion,
    Hardness, QuizSession, Ruleset, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g. database,
/// object store, generator) into the taxonomy the core exposes to callers.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The entity does not exist, or exists but is not owned by the caller.
    /// The two cases are merged so existence never leaks across owners.
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Store write failed: {0}")]
    Persistence(String),
    #[error("Question generation failed: {0}")]
    Generation(String),
    /// The operation conflicts with the entity's current lifecycle state.
    #[error("State conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Methods ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        full_name: Option<&str>,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    async fn get_user_settings(&self, user_id: Uuid) -> PortResult<Option<serde_json::Value>>;

    async fn upsert_user_settings(
        &self,
        user_id: Uuid,
        preferences: &serde_json::Value,
    ) -> PortResult<()>;

    // --- Document Management ---
    async fn insert_document(&self, document: &Document) -> PortResult<()>;

    /// Ownership and existence are checked together: a document owned by
    /// someone else reports the same `NotFound` as a missing one.
    async fn get_document(&self, document_id: Uuid, owner_id: Uuid) -> PortResult<Document>;

    async fn list_documents(&self, owner_id: Uuid) -> PortResult<Vec<Document>>;

    /// Guarded transition pending -> processing. Returns false if the document
    /// was not in `pending` (status never regresses).
    async fn mark_document_processing(&self, document_id: Uuid) -> PortResult<bool>;

    /// Guarded transition processing -> completed, recording the storage
    /// location. Returns false if the document was not in `processing`.
    async fn mark_document_completed(
        &self,
        document_id: Uuid,
        storage_location: &str,
    ) -> PortResult<bool>;

    /// Terminal failure transition from any non-terminal state, recording a
    /// human-readable message.
    async fn mark_document_failed(&self, document_id: Uuid, error_message: &str)
        -> PortResult<()>;

    /// Deletes the record; associated extracted text goes with it.
    async fn delete_document(&self, document_id: Uuid, owner_id: Uuid) -> PortResult<()>;

    // --- Extracted Text ---
    async fn insert_extracted_text(&self, extracted: &ExtractedText) -> PortResult<()>;

    async fn get_extracted_text(&self, document_id: Uuid) -> PortResult<ExtractedText>;

    // --- Rulesets ---
    async fn insert_ruleset(&self, ruleset: &Ruleset) -> PortResult<()>;

    /// Existence-only lookup, used by generation and quiz creation.
    async fn get_ruleset(&self, ruleset_id: Uuid) -> PortResult<Ruleset>;

    /// Ownership-checked lookup for the read API.
    async fn get_ruleset_owned(&self, ruleset_id: Uuid, owner_id: Uuid) -> PortResult<Ruleset>;

    async fn list_rulesets(&self, owner_id: Uuid) -> PortResult<Vec<Ruleset>>;

    // --- Generated Questions ---
    /// Persists a generation batch atomically: either every question is
    /// stored or none are.
    async fn insert_questions(&self, questions: &[GeneratedQuestion]) -> PortResult<()>;

    /// Question texts previously generated under a ruleset, newest first.
    async fn recent_question_texts(&self, ruleset_id: Uuid, limit: u32)
        -> PortResult<Vec<String>>;

    async fn get_questions_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<GeneratedQuestion>>;

    // --- Quiz Sessions ---
    async fn insert_quiz(&self, quiz: &QuizSession) -> PortResult<()>;

    async fn get_quiz(&self, quiz_id: Uuid, owner_id: Uuid) -> PortResult<QuizSession>;

    /// Compare-and-swap created -> in_progress, setting the start time.
    /// Returns false if the quiz exists but was not in `created`.
    async fn begin_quiz(
        &self,
        quiz_id: Uuid,
        owner_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> PortResult<bool>;

    async fn insert_answer(&self, answer: &AnswerSubmission) -> PortResult<()>;

    /// All submissions for a quiz in answered_at order.
    async fn list_answers(&self, quiz_id: Uuid) -> PortResult<Vec<AnswerSubmission>>;

    /// Compare-and-swap into `completed`, committing end time and score.
    /// Returns false if the quiz was already completed, so only the first
    /// finisher commits a score.
    async fn complete_quiz(
        &self,
        quiz_id: Uuid,
        owner_id: Uuid,
        end_time: DateTime<Utc>,
        score: f64,
    ) -> PortResult<bool>;
}

#[async_trait]
pub trait ObjectStoreService: Send + Sync {
    /// Stores a blob at the given path, overwriting any previous content.
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> PortResult<()>;

    /// Removes the blob at the given path.
    async fn remove(&self, path: &str) -> PortResult<()>;
}

#[async_trait]
pub trait TextExtractionService: Send + Sync {
    /// Extracts plain text from a document's raw bytes.
    ///
    /// Pages or slides are concatenated in document order, separated by
    /// newlines; a page or shape with no extractable text contributes
    /// nothing and is never an error.
    async fn extract(&self, format: FileFormat, content: &[u8]) -> PortResult<String>;
}

/// Parameters passed to the external question generator.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub num_questions: u32,
    pub hardness: Hardness,
    pub bloom_levels: Vec<BloomLevel>,
    pub topic: Option<String>,
    /// Previously generated question texts the generator should avoid.
    /// Advisory only; the generator is not guaranteed to honor it.
    pub avoid: Vec<String>,
}

/// A question as returned by the generator, before validation and persistence.
#[derive(Debug, Clone)]
pub struct CandidateQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub difficulty: Option<Hardness>,
    pub bloom_level: Option<BloomLevel>,
}

#[async_trait]
pub trait QuestionGeneratorService: Send + Sync {
    /// Generates candidate questions from source text. Every call is
    /// fallible; output that cannot be parsed as the expected shape surfaces
    /// as `PortError::Generation`.
    async fn generate(
        &self,
        source_text: &str,
        params: &GenerationParams,
    ) -> PortResult<Vec<CandidateQuestion>>;
}
