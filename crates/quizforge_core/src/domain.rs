//! crates/quizforge_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport format; only the
//! ruleset configuration carries serde derives, because it is a JSON mapping
//! by contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Documents and Extraction
//=========================================================================================

/// Accepted upload formats, dispatched from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pdf,
    Ppt,
    Pptx,
}

impl FileFormat {
    /// Resolves a format from a filename's extension, case-insensitively.
    /// Returns `None` for anything outside the accepted set.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "ppt" => Some(Self::Ppt),
            "pptx" => Some(Self::Pptx),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Ppt => "application/vnd.ms-powerpoint",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }
}

/// Processing state of an uploaded document.
///
/// Transitions are monotonic: Pending -> Processing -> Completed | Failed.
/// Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Represents one uploaded document and its processing state.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub byte_size: i64,
    pub status: DocumentStatus,
    /// Set exactly once, when processing completes.
    pub storage_location: Option<String>,
    /// Set exactly once, when processing fails.
    pub error_message: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Text extracted from a completed document. Written once, never mutated.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub document_id: Uuid,
    pub text: String,
    /// Always 1: extraction stores the whole document as a single page.
    pub page_number: i32,
}

//=========================================================================================
// Rulesets
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hardness {
    Easy,
    Medium,
    Hard,
}

impl Hardness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// Bloom's taxonomy levels recognized by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl BloomLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remember => "remember",
            Self::Understand => "understand",
            Self::Apply => "apply",
            Self::Analyze => "analyze",
            Self::Evaluate => "evaluate",
            Self::Create => "create",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "remember" => Some(Self::Remember),
            "understand" => Some(Self::Understand),
            "apply" => Some(Self::Apply),
            "analyze" => Some(Self::Analyze),
            "evaluate" => Some(Self::Evaluate),
            "create" => Some(Self::Create),
            _ => None,
        }
    }
}

/// When correctness feedback would be shown to the quiz taker.
/// Snapshotted onto each quiz at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingStyle {
    EndOnly,
    Immediate,
}

impl GradingStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EndOnly => "end_only",
            Self::Immediate => "immediate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "end_only" => Some(Self::EndOnly),
            "immediate" => Some(Self::Immediate),
            _ => None,
        }
    }
}

/// The configuration mapping of a ruleset. Stored as JSON; unknown keys from
/// older clients are ignored on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesetConfig {
    #[serde(default = "default_num_questions")]
    pub num_questions: u32,
    #[serde(default = "default_hardness")]
    pub hardness: Hardness,
    #[serde(default = "default_bloom_levels")]
    pub bloom_levels: Vec<BloomLevel>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default = "default_grading_style")]
    pub grading_style: GradingStyle,
    /// Minutes; None means quizzes from this ruleset are untimed by default.
    #[serde(default)]
    pub time_limit: Option<u32>,
}

fn default_num_questions() -> u32 {
    5
}

fn default_hardness() -> Hardness {
    Hardness::Medium
}

fn default_bloom_levels() -> Vec<BloomLevel> {
    vec![BloomLevel::Remember, BloomLevel::Understand]
}

fn default_grading_style() -> GradingStyle {
    GradingStyle::EndOnly
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self {
            num_questions: default_num_questions(),
            hardness: default_hardness(),
            bloom_levels: default_bloom_levels(),
            topic: None,
            grading_style: default_grading_style(),
            time_limit: None,
        }
    }
}

/// A named, reusable question-generation configuration. Immutable after
/// creation.
#[derive(Debug, Clone)]
pub struct Ruleset {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub config: RulesetConfig,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Questions
//=========================================================================================

/// A generated multiple-choice question. Created in batches; immutable.
#[derive(Debug, Clone)]
pub struct GeneratedQuestion {
    pub id: Uuid,
    pub ruleset_id: Uuid,
    pub text: String,
    /// Exactly 4 answer strings in presentation order.
    pub options: Vec<String>,
    /// Equals exactly one entry of `options`.
    pub answer: String,
    pub difficulty: Hardness,
    pub bloom_level: BloomLevel,
    pub topic: Option<String>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Quiz Sessions
//=========================================================================================

/// Lifecycle of a quiz session: Created -> InProgress -> Completed, strictly
/// forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStatus {
    Created,
    InProgress,
    Completed,
}

impl QuizStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// One instantiation of a question set into a timed or untimed attempt.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Fixed at creation; scoring divides by its length.
    pub question_ids: Vec<Uuid>,
    pub timed: bool,
    pub time_limit_minutes: Option<u32>,
    /// Snapshot of the ruleset's grading style at creation time.
    pub grading_style: GradingStyle,
    pub status: QuizStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: Option<f64>,
}

/// One submitted answer. The log is append-only; duplicate submissions per
/// question are retained and resolved at scoring time (latest wins).
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    pub quiz_id: Uuid,
    pub question_id: Uuid,
    pub selected_answer: String,
    pub answered_at: DateTime<Utc>,
}

/// Per-question correctness entry in a quiz result.
#[derive(Debug, Clone)]
pub struct AnswerDetail {
    pub question_id: Uuid,
    pub selected_answer: String,
    pub correct_answer: Option<String>,
    pub is_correct: bool,
}

/// The outcome of finishing a quiz.
#[derive(Debug, Clone)]
pub struct QuizResult {
    pub quiz_id: Uuid,
    pub score: f64,
    pub total_questions: usize,
    pub correct_answers: usize,
    /// Whole minutes between start and finish; None if the quiz was never
    /// started.
    pub time_taken: Option<i64>,
    pub answers: Vec<AnswerDetail>,
}

//=========================================================================================
// Identity
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a bearer login session (token or cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
