//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification plus the service
//! health endpoint.

use axum::Json;
use utoipa::{OpenApi, ToSchema};

use crate::web::{auth, files, quizzes};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        auth::get_settings_handler,
        auth::update_settings_handler,
        files::upload_file_handler,
        files::file_status_handler,
        files::list_files_handler,
        files::delete_file_handler,
        quizzes::create_ruleset_handler,
        quizzes::get_ruleset_handler,
        quizzes::list_rulesets_handler,
        quizzes::generate_questions_handler,
        quizzes::create_quiz_handler,
        quizzes::start_quiz_handler,
        quizzes::submit_answer_handler,
        quizzes::finish_quiz_handler,
        health_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            auth::UserResponse,
            auth::SettingsUpdateRequest,
            auth::SettingsResponse,
            files::FileResponse,
            quizzes::CreateRulesetRequest,
            quizzes::RulesetResponse,
            quizzes::GenerateQuestionsRequest,
            quizzes::QuestionResponse,
            quizzes::CreateQuizRequest,
            quizzes::QuizResponse,
            quizzes::SubmitAnswerRequest,
            quizzes::AnswerDetailResponse,
            quizzes::QuizResultResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "QuizForge API", description = "Document ingestion, question generation and quiz sessions.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health
//=========================================================================================

#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "quizforge-api",
    })
}
