//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use quizforge_core::ingestion::IngestionPipeline;
use quizforge_core::ports::DatabaseService;
use quizforge_core::quiz::QuizEngine;

use crate::config::Config;
use crate::web::ingest_task::IngestQueue;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub pipeline: Arc<IngestionPipeline>,
    pub engine: Arc<QuizEngine>,
    pub ingest: IngestQueue,
}
