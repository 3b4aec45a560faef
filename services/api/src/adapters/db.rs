//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use quizforge_core::domain::{
    AnswerSubmission, BloomLevel, Document, DocumentStatus, ExtractedText, GeneratedQuestion,
    GradingStyle, Hardness, QuizSession, QuizStatus, Ruleset, RulesetConfig, User,
    UserCredentials,
};
use quizforge_core::ports::{DatabaseService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn persistence(e: sqlx::Error) -> PortError {
    PortError::Persistence(e.to_string())
}

fn not_found_or(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    full_name: Option<String>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            full_name: self.full_name,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    owner_id: Uuid,
    filename: String,
    byte_size: i64,
    status: String,
    storage_location: Option<String>,
    error_message: Option<String>,
    uploaded_at: DateTime<Utc>,
}
impl DocumentRecord {
    fn to_domain(self) -> PortResult<Document> {
        let status = DocumentStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("unknown document status {:?}", self.status))
        })?;
        Ok(Document {
            id: self.id,
            owner_id: self.owner_id,
            filename: self.filename,
            byte_size: self.byte_size,
            status,
            storage_location: self.storage_location,
            error_message: self.error_message,
            uploaded_at: self.uploaded_at,
        })
    }
}

#[derive(FromRow)]
struct ExtractedTextRecord {
    document_id: Uuid,
    text: String,
    page_number: i32,
}
impl ExtractedTextRecord {
    fn to_domain(self) -> ExtractedText {
        ExtractedText {
            document_id: self.document_id,
            text: self.text,
            page_number: self.page_number,
        }
    }
}

#[derive(FromRow)]
struct RulesetRecord {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    config: serde_json::Value,
    created_at: DateTime<Utc>,
}
impl RulesetRecord {
    fn to_domain(self) -> PortResult<Ruleset> {
        let config: RulesetConfig = serde_json::from_value(self.config)
            .map_err(|e| PortError::Unexpected(format!("invalid ruleset config: {e}")))?;
        Ok(Ruleset {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            config,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct QuestionRecord {
    id: Uuid,
    ruleset_id: Uuid,
    question_text: String,
    options: serde_json::Value,
    answer: String,
    difficulty: String,
    bloom_level: String,
    topic: Option<String>,
    created_at: DateTime<Utc>,
}
impl QuestionRecord {
    fn to_domain(self) -> PortResult<GeneratedQuestion> {
        let options: Vec<String> = serde_json::from_value(self.options)
            .map_err(|e| PortError::Unexpected(format!("invalid question options: {e}")))?;
        let difficulty = Hardness::parse(&self.difficulty).ok_or_else(|| {
            PortError::Unexpected(format!("unknown difficulty {:?}", self.difficulty))
        })?;
        let bloom_level = BloomLevel::parse(&self.bloom_level).ok_or_else(|| {
            PortError::Unexpected(format!("unknown bloom level {:?}", self.bloom_level))
        })?;
        Ok(GeneratedQuestion {
            id: self.id,
            ruleset_id: self.ruleset_id,
            text: self.question_text,
            options,
            answer: self.answer,
            difficulty,
            bloom_level,
            topic: self.topic,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct QuizRecord {
    id: Uuid,
    owner_id: Uuid,
    question_ids: Vec<Uuid>,
    timed: bool,
    time_limit_minutes: Option<i32>,
    grading_style: String,
    status: String,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    score: Option<f64>,
}
impl QuizRecord {
    fn to_domain(self) -> PortResult<QuizSession> {
        let grading_style = GradingStyle::parse(&self.grading_style).ok_or_else(|| {
            PortError::Unexpected(format!("unknown grading style {:?}", self.grading_style))
        })?;
        let status = QuizStatus::parse(&self.status)
            .ok_or_else(|| PortError::Unexpected(format!("unknown quiz status {:?}", self.status)))?;
        Ok(QuizSession {
            id: self.id,
            owner_id: self.owner_id,
            question_ids: self.question_ids,
            timed: self.timed,
            time_limit_minutes: self.time_limit_minutes.map(|m| m as u32),
            grading_style,
            status,
            start_time: self.start_time,
            end_time: self.end_time,
            score: self.score,
        })
    }
}

#[derive(FromRow)]
struct AnswerRecord {
    quiz_id: Uuid,
    question_id: Uuid,
    selected_answer: String,
    answered_at: DateTime<Utc>,
}
impl AnswerRecord {
    fn to_domain(self) -> AnswerSubmission {
        AnswerSubmission {
            quiz_id: self.quiz_id,
            question_id: self.question_id,
            selected_answer: self.selected_answer,
            answered_at: self.answered_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        full_name: Option<&str>,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, full_name, hashed_password) \
             VALUES ($1, $2, $3, $4) \
             RETURNING user_id, email, full_name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(full_name)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("User {email} not found")))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, full_name, created_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("User {user_id} not found")))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        row.map(|(user_id,)| user_id).ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_user_settings(&self, user_id: Uuid) -> PortResult<Option<serde_json::Value>> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT preferences FROM user_settings WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(row.map(|(preferences,)| preferences))
    }

    async fn upsert_user_settings(
        &self,
        user_id: Uuid,
        preferences: &serde_json::Value,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_settings (user_id, preferences) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET preferences = EXCLUDED.preferences",
        )
        .bind(user_id)
        .bind(preferences)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn insert_document(&self, document: &Document) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO documents \
             (id, owner_id, filename, byte_size, status, uploaded_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(document.id)
        .bind(document.owner_id)
        .bind(&document.filename)
        .bind(document.byte_size)
        .bind(document.status.as_str())
        .bind(document.uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn get_document(&self, document_id: Uuid, owner_id: Uuid) -> PortResult<Document> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, owner_id, filename, byte_size, status, storage_location, \
             error_message, uploaded_at \
             FROM documents WHERE id = $1 AND owner_id = $2",
        )
        .bind(document_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("Document {document_id} not found")))?;
        record.to_domain()
    }

    async fn list_documents(&self, owner_id: Uuid) -> PortResult<Vec<Document>> {
        let records = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, owner_id, filename, byte_size, status, storage_location, \
             error_message, uploaded_at \
             FROM documents WHERE owner_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn mark_document_processing(&self, document_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE documents SET status = 'processing' WHERE id = $1 AND status = 'pending'",
        )
        .bind(document_id)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_document_completed(
        &self,
        document_id: Uuid,
        storage_location: &str,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE documents SET status = 'completed', storage_location = $2 \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(document_id)
        .bind(storage_location)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_document_failed(
        &self,
        document_id: Uuid,
        error_message: &str,
    ) -> PortResult<()> {
        // Terminal states stay terminal, even on a failure report.
        sqlx::query(
            "UPDATE documents SET status = 'failed', error_message = $2 \
             WHERE id = $1 AND status IN ('pending', 'processing')",
        )
        .bind(document_id)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn delete_document(&self, document_id: Uuid, owner_id: Uuid) -> PortResult<()> {
        // extracted_texts goes with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND owner_id = $2")
            .bind(document_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Document {document_id} not found"
            )));
        }
        Ok(())
    }

    async fn insert_extracted_text(&self, extracted: &ExtractedText) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO extracted_texts (document_id, text, page_number) VALUES ($1, $2, $3)",
        )
        .bind(extracted.document_id)
        .bind(&extracted.text)
        .bind(extracted.page_number)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn get_extracted_text(&self, document_id: Uuid) -> PortResult<ExtractedText> {
        let record = sqlx::query_as::<_, ExtractedTextRecord>(
            "SELECT document_id, text, page_number FROM extracted_texts WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            not_found_or(e, || format!("Document content for {document_id} not found"))
        })?;
        Ok(record.to_domain())
    }

    async fn insert_ruleset(&self, ruleset: &Ruleset) -> PortResult<()> {
        let config = serde_json::to_value(&ruleset.config)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        sqlx::query(
            "INSERT INTO rulesets (id, owner_id, name, config, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(ruleset.id)
        .bind(ruleset.owner_id)
        .bind(&ruleset.name)
        .bind(config)
        .bind(ruleset.created_at)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn get_ruleset(&self, ruleset_id: Uuid) -> PortResult<Ruleset> {
        let record = sqlx::query_as::<_, RulesetRecord>(
            "SELECT id, owner_id, name, config, created_at FROM rulesets WHERE id = $1",
        )
        .bind(ruleset_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("Ruleset {ruleset_id} not found")))?;
        record.to_domain()
    }

    async fn get_ruleset_owned(&self, ruleset_id: Uuid, owner_id: Uuid) -> PortResult<Ruleset> {
        let record = sqlx::query_as::<_, RulesetRecord>(
            "SELECT id, owner_id, name, config, created_at \
             FROM rulesets WHERE id = $1 AND owner_id = $2",
        )
        .bind(ruleset_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("Ruleset {ruleset_id} not found")))?;
        record.to_domain()
    }

    async fn list_rulesets(&self, owner_id: Uuid) -> PortResult<Vec<Ruleset>> {
        let records = sqlx::query_as::<_, RulesetRecord>(
            "SELECT id, owner_id, name, config, created_at \
             FROM rulesets WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn insert_questions(&self, questions: &[GeneratedQuestion]) -> PortResult<()> {
        // One transaction for the whole batch: either every question lands
        // or none do.
        let mut tx = self.pool.begin().await.map_err(persistence)?;
        for question in questions {
            let options = serde_json::to_value(&question.options)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            sqlx::query(
                "INSERT INTO generated_questions \
                 (id, ruleset_id, question_text, options, answer, difficulty, bloom_level, \
                  topic, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(question.id)
            .bind(question.ruleset_id)
            .bind(&question.text)
            .bind(options)
            .bind(&question.answer)
            .bind(question.difficulty.as_str())
            .bind(question.bloom_level.as_str())
            .bind(&question.topic)
            .bind(question.created_at)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;
        }
        tx.commit().await.map_err(persistence)?;
        Ok(())
    }

    async fn recent_question_texts(
        &self,
        ruleset_id: Uuid,
        limit: u32,
    ) -> PortResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT question_text FROM generated_questions \
             WHERE ruleset_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(ruleset_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(|(text,)| text).collect())
    }

    async fn get_questions_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<GeneratedQuestion>> {
        let records = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, ruleset_id, question_text, options, answer, difficulty, bloom_level, \
             topic, created_at \
             FROM generated_questions WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn insert_quiz(&self, quiz: &QuizSession) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO quizzes \
             (id, owner_id, question_ids, timed, time_limit_minutes, grading_style, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(quiz.id)
        .bind(quiz.owner_id)
        .bind(&quiz.question_ids)
        .bind(quiz.timed)
        .bind(quiz.time_limit_minutes.map(|m| m as i32))
        .bind(quiz.grading_style.as_str())
        .bind(quiz.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn get_quiz(&self, quiz_id: Uuid, owner_id: Uuid) -> PortResult<QuizSession> {
        let record = sqlx::query_as::<_, QuizRecord>(
            "SELECT id, owner_id, question_ids, timed, time_limit_minutes, grading_style, \
             status, start_time, end_time, score \
             FROM quizzes WHERE id = $1 AND owner_id = $2",
        )
        .bind(quiz_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, || format!("Quiz {quiz_id} not found")))?;
        record.to_domain()
    }

    async fn begin_quiz(
        &self,
        quiz_id: Uuid,
        owner_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE quizzes SET status = 'in_progress', start_time = $3 \
             WHERE id = $1 AND owner_id = $2 AND status = 'created'",
        )
        .bind(quiz_id)
        .bind(owner_id)
        .bind(start_time)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        // Distinguish "already started" from "not yours / missing".
        self.get_quiz(quiz_id, owner_id).await?;
        Ok(false)
    }

    async fn insert_answer(&self, answer: &AnswerSubmission) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO quiz_answers (quiz_id, question_id, selected_answer, answered_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(answer.quiz_id)
        .bind(answer.question_id)
        .bind(&answer.selected_answer)
        .bind(answer.answered_at)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn list_answers(&self, quiz_id: Uuid) -> PortResult<Vec<AnswerSubmission>> {
        let records = sqlx::query_as::<_, AnswerRecord>(
            "SELECT quiz_id, question_id, selected_answer, answered_at \
             FROM quiz_answers WHERE quiz_id = $1 ORDER BY answered_at ASC, id ASC",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn complete_quiz(
        &self,
        quiz_id: Uuid,
        owner_id: Uuid,
        end_time: DateTime<Utc>,
        score: f64,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE quizzes SET status = 'completed', end_time = $3, score = $4 \
             WHERE id = $1 AND owner_id = $2 AND status <> 'completed'",
        )
        .bind(quiz_id)
        .bind(owner_id)
        .bind(end_time)
        .bind(score)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        self.get_quiz(quiz_id, owner_id).await?;
        Ok(false)
    }
}
