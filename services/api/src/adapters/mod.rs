pub mod db;
pub mod extract;
pub mod generator_llm;
pub mod storage;

pub use db::DbAdapter;
pub use extract::DocumentExtractor;
pub use generator_llm::LlmGeneratorAdapter;
pub use storage::FsStorageAdapter;
