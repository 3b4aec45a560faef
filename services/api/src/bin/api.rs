//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, DocumentExtractor, FsStorageAdapter, LlmGeneratorAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{
            get_settings_handler, login_handler, logout_handler, me_handler, signup_handler,
            update_settings_handler,
        },
        files::{
            delete_file_handler, file_status_handler, list_files_handler, upload_file_handler,
        },
        quizzes::{
            create_quiz_handler, create_ruleset_handler, finish_quiz_handler,
            generate_questions_handler, get_ruleset_handler, list_rulesets_handler,
            start_quiz_handler, submit_answer_handler,
        },
        require_auth,
        rest::{health_handler, ApiDoc},
        spawn_ingest_workers,
        state::AppState,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use quizforge_core::{ingestion::IngestionPipeline, quiz::QuizEngine};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter
        .run_migrations()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let storage_adapter = Arc::new(FsStorageAdapter::new(config.storage_root.clone()));
    let extractor = Arc::new(DocumentExtractor::new());

    let generator_config = OpenAIConfig::new()
        .with_api_key(&config.generator_api_key)
        .with_api_base(&config.generator_api_base);
    let generator_client = Client::with_config(generator_config);
    let generator_adapter = Arc::new(LlmGeneratorAdapter::new(
        generator_client,
        config.generator_model.clone(),
    ));

    // --- 4. Build the Core Engines & Worker Pool ---
    let pipeline = Arc::new(IngestionPipeline::new(
        db_adapter.clone(),
        storage_adapter,
        extractor,
    ));
    let engine = Arc::new(QuizEngine::new(db_adapter.clone(), generator_adapter));
    let ingest = spawn_ingest_workers(pipeline.clone(), config.ingest_workers);
    info!(workers = config.ingest_workers, "ingestion worker pool running");

    // --- 5. Build the Shared AppState ---
    let app_state = AppState {
        db: db_adapter,
        config: config.clone(),
        pipeline,
        engine,
        ingest,
    };

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allowed_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("invalid ALLOWED_ORIGIN: {e}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/health", get(health_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/users/me", get(me_handler))
        .route(
            "/users/me/settings",
            get(get_settings_handler).put(update_settings_handler),
        )
        .route("/files/upload", post(upload_file_handler))
        .route("/files", get(list_files_handler))
        .route("/files/{file_id}", delete(delete_file_handler))
        .route("/files/{file_id}/status", get(file_status_handler))
        .route(
            "/rulesets",
            post(create_ruleset_handler).get(list_rulesets_handler),
        )
        .route("/rulesets/{ruleset_id}", get(get_ruleset_handler))
        .route("/generate", post(generate_questions_handler))
        .route("/quizzes", post(create_quiz_handler))
        .route("/quizzes/{quiz_id}/start", post(start_quiz_handler))
        .route("/quizzes/{quiz_id}/answer", post(submit_answer_handler))
        .route("/quizzes/{quiz_id}/finish", post(finish_quiz_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
