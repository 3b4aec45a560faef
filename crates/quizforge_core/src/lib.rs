pub mod domain;
pub mod ingestion;
pub mod ports;
pub mod quiz;

pub use domain::{
    AnswerDetail, AnswerSubmission, BloomLevel, Document, DocumentStatus, ExtractedText,
    FileFormat, GeneratedQuestion, GradingStyle, Hardness, QuizResult, QuizSession, QuizStatus,
    Ruleset, RulesetConfig, User, UserCredentials,
};
pub use ingestion::{storage_path, IngestJob, IngestionPipeline};
pub use ports::{
    CandidateQuestion, DatabaseService, GenerationParams, ObjectStoreService, PortError,
    PortResult, QuestionGeneratorService, TextExtractionService,
};
pub use quiz::QuizEngine;
