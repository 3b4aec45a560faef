pub mod auth;
pub mod files;
pub mod ingest_task;
pub mod middleware;
pub mod quizzes;
pub mod rest;
pub mod state;

pub use ingest_task::spawn_ingest_workers;
pub use middleware::require_auth;
pub use rest::ApiDoc;
