//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Root directory of the filesystem object store.
    pub storage_root: PathBuf,
    pub generator_api_key: String,
    /// OpenAI-compatible endpoint the generator client talks to.
    pub generator_api_base: String,
    pub generator_model: String,
    /// Number of background ingestion workers.
    pub ingest_workers: usize,
    pub allowed_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let storage_root = std::env::var("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./storage"));

        // --- Load Generator Settings ---
        let generator_api_key = std::env::var("GENERATOR_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GENERATOR_API_KEY".to_string()))?;
        let generator_api_base = std::env::var("GENERATOR_API_BASE").unwrap_or_else(|_| {
            "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
        });
        let generator_model =
            std::env::var("GENERATOR_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());

        // --- Load Ingestion and CORS Settings ---
        let ingest_workers_str =
            std::env::var("INGEST_WORKERS").unwrap_or_else(|_| "4".to_string());
        let ingest_workers = ingest_workers_str
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidValue("INGEST_WORKERS".to_string(), e.to_string()))?;
        if ingest_workers == 0 {
            return Err(ConfigError::InvalidValue(
                "INGEST_WORKERS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            storage_root,
            generator_api_key,
            generator_api_base,
            generator_model,
            ingest_workers,
            allowed_origin,
        })
    }
}
