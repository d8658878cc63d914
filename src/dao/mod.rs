/// Trivia, score and settings storage and retrieval operations.
pub mod contest_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
