//! services/api/src/web/quizzes.rs
//!
//! Ruleset management, question generation and the quiz lifecycle endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use quizforge_core::domain::{
    AnswerDetail, GeneratedQuestion, QuizResult, QuizSession, Ruleset, RulesetConfig,
};

use crate::error::ApiError;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateRulesetRequest {
    pub name: String,
    /// Recognized keys: num_questions, hardness, bloom_levels, topic,
    /// grading_style, time_limit. Missing keys take their defaults.
    #[schema(value_type = Object)]
    pub config: RulesetConfig,
}

#[derive(Serialize, ToSchema)]
pub struct RulesetResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Ruleset> for RulesetResponse {
    type Error = ApiError;

    fn try_from(ruleset: Ruleset) -> Result<Self, ApiError> {
        let config = serde_json::to_value(&ruleset.config)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(Self {
            id: ruleset.id,
            owner_id: ruleset.owner_id,
            name: ruleset.name,
            config,
            created_at: ruleset.created_at,
        })
    }
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateQuestionsRequest {
    pub file_id: Uuid,
    pub ruleset_id: Uuid,
    pub topic: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub ruleset_id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
    pub answer: String,
    pub difficulty: String,
    pub bloom_level: String,
    pub topic: Option<String>,
}

impl From<GeneratedQuestion> for QuestionResponse {
    fn from(question: GeneratedQuestion) -> Self {
        Self {
            id: question.id,
            ruleset_id: question.ruleset_id,
            question_text: question.text,
            options: question.options,
            answer: question.answer,
            difficulty: question.difficulty.as_str().to_string(),
            bloom_level: question.bloom_level.as_str().to_string(),
            topic: question.topic,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateQuizRequest {
    pub ruleset_id: Uuid,
    pub question_ids: Vec<Uuid>,
    /// Minutes; presence makes the quiz timed.
    pub time_limit: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct QuizResponse {
    pub quiz_id: Uuid,
    pub owner_id: Uuid,
    pub question_ids: Vec<Uuid>,
    pub timed: bool,
    pub time_limit: Option<u32>,
    pub grading_style: String,
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: Option<f64>,
}

impl From<QuizSession> for QuizResponse {
    fn from(quiz: QuizSession) -> Self {
        Self {
            quiz_id: quiz.id,
            owner_id: quiz.owner_id,
            question_ids: quiz.question_ids,
            timed: quiz.timed,
            time_limit: quiz.time_limit_minutes,
            grading_style: quiz.grading_style.as_str().to_string(),
            status: quiz.status.as_str().to_string(),
            start_time: quiz.start_time,
            end_time: quiz.end_time,
            score: quiz.score,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    pub question_id: Uuid,
    pub selected_answer: String,
}

#[derive(Serialize, ToSchema)]
pub struct AnswerDetailResponse {
    pub question_id: Uuid,
    pub selected_answer: String,
    pub correct_answer: Option<String>,
    pub is_correct: bool,
}

impl From<AnswerDetail> for AnswerDetailResponse {
    fn from(detail: AnswerDetail) -> Self {
        Self {
            question_id: detail.question_id,
            selected_answer: detail.selected_answer,
            correct_answer: detail.correct_answer,
            is_correct: detail.is_correct,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuizResultResponse {
    pub quiz_id: Uuid,
    pub score: f64,
    pub total_questions: usize,
    pub correct_answers: usize,
    /// Whole minutes; absent if the quiz was never started.
    pub time_taken: Option<i64>,
    pub answers: Vec<AnswerDetailResponse>,
}

impl From<QuizResult> for QuizResultResponse {
    fn from(result: QuizResult) -> Self {
        Self {
            quiz_id: result.quiz_id,
            score: result.score,
            total_questions: result.total_questions,
            correct_answers: result.correct_answers,
            time_taken: result.time_taken,
            answers: result.answers.into_iter().map(Into::into).collect(),
        }
    }
}

//=========================================================================================
// Ruleset Handlers
//=========================================================================================

/// Create a new quiz generation ruleset.
#[utoipa::path(
    post,
    path = "/rulesets",
    request_body = CreateRulesetRequest,
    responses(
        (status = 201, description = "Ruleset created", body = RulesetResponse),
        (status = 400, description = "Invalid configuration"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_ruleset_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateRulesetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.config.num_questions == 0 {
        return Err(ApiError::BadRequest(
            "num_questions must be at least 1".to_string(),
        ));
    }

    let ruleset = Ruleset {
        id: Uuid::new_v4(),
        owner_id: user_id,
        name: req.name,
        config: req.config,
        created_at: Utc::now(),
    };
    state.db.insert_ruleset(&ruleset).await?;

    Ok((StatusCode::CREATED, Json(RulesetResponse::try_from(ruleset)?)))
}

/// Get a specific ruleset by ID.
#[utoipa::path(
    get,
    path = "/rulesets/{ruleset_id}",
    params(("ruleset_id" = Uuid, Path, description = "The ruleset's id")),
    responses(
        (status = 200, description = "The ruleset", body = RulesetResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such ruleset for this user")
    )
)]
pub async fn get_ruleset_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Path(ruleset_id): Path<Uuid>,
) -> Result<Json<RulesetResponse>, ApiError> {
    let ruleset = state.db.get_ruleset_owned(ruleset_id, user_id).await?;
    Ok(Json(RulesetResponse::try_from(ruleset)?))
}

/// List all rulesets for the current user.
#[utoipa::path(
    get,
    path = "/rulesets",
    responses(
        (status = 200, description = "The user's rulesets", body = [RulesetResponse]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_rulesets_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<RulesetResponse>>, ApiError> {
    let rulesets = state.db.list_rulesets(user_id).await?;
    let responses = rulesets
        .into_iter()
        .map(RulesetResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(responses))
}

//=========================================================================================
// Generation and Quiz Handlers
//=========================================================================================

/// Generate questions using AI based on file content and ruleset.
#[utoipa::path(
    post,
    path = "/generate",
    request_body = GenerateQuestionsRequest,
    responses(
        (status = 201, description = "Questions generated and stored", body = [QuestionResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Document, extracted text or ruleset missing"),
        (status = 502, description = "Generator failed or returned malformed output")
    )
)]
pub async fn generate_questions_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<GenerateQuestionsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let questions = state
        .engine
        .generate(user_id, req.file_id, req.ruleset_id, req.topic)
        .await?;
    let responses: Vec<QuestionResponse> =
        questions.into_iter().map(QuestionResponse::from).collect();
    Ok((StatusCode::CREATED, Json(responses)))
}

/// Create a new quiz session.
#[utoipa::path(
    post,
    path = "/quizzes",
    request_body = CreateQuizRequest,
    responses(
        (status = 201, description = "Quiz created", body = QuizResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Ruleset missing")
    )
)]
pub async fn create_quiz_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let quiz = state
        .engine
        .create_quiz(user_id, req.ruleset_id, req.question_ids, req.time_limit)
        .await?;
    Ok((StatusCode::CREATED, Json(QuizResponse::from(quiz))))
}

/// Start a quiz session. The clock begins here; starting twice is rejected.
#[utoipa::path(
    post,
    path = "/quizzes/{quiz_id}/start",
    params(("quiz_id" = Uuid, Path, description = "The quiz's id")),
    responses(
        (status = 200, description = "Quiz started", body = QuizResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such quiz for this user"),
        (status = 409, description = "Quiz already started")
    )
)]
pub async fn start_quiz_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Path(quiz_id): Path<Uuid>,
) -> Result<Json<QuizResponse>, ApiError> {
    let quiz = state.engine.start_quiz(quiz_id, user_id).await?;
    Ok(Json(QuizResponse::from(quiz)))
}

/// Submit an answer for a quiz question. Submissions are appended as-is;
/// re-answering a question replaces the earlier answer at scoring time.
#[utoipa::path(
    post,
    path = "/quizzes/{quiz_id}/answer",
    params(("quiz_id" = Uuid, Path, description = "The quiz's id")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn submit_answer_handler(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .submit_answer(quiz_id, req.question_id, req.selected_answer)
        .await?;
    Ok(Json(serde_json::json!({
        "message": "Answer submitted successfully"
    })))
}

/// Finish a quiz and calculate results.
#[utoipa::path(
    post,
    path = "/quizzes/{quiz_id}/finish",
    params(("quiz_id" = Uuid, Path, description = "The quiz's id")),
    responses(
        (status = 200, description = "Final score and per-answer breakdown", body = QuizResultResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such quiz for this user"),
        (status = 409, description = "Quiz already completed")
    )
)]
pub async fn finish_quiz_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Path(quiz_id): Path<Uuid>,
) -> Result<Json<QuizResultResponse>, ApiError> {
    let result = state.engine.finish_quiz(quiz_id, user_id).await?;
    Ok(Json(QuizResultResponse::from(result)))
}
