//! Error types for question answering

use thiserror::Error;

use crate::error::Error as CrateError;
use crate::index::DbError;

/// Errors that can occur while answering a question
#[derive(Debug, Error)]
pub enum SearchError {
    /// Error occurred during database operations
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Error occurred during embedding generation
    #[error("Embedding error: {0}")]
    Embedding(#[from] rig::embeddings::EmbeddingError),

    /// The answering model failed
    #[error("Completion error: {0}")]
    Completion(#[from] rig::completion::CompletionError),

    /// The question was empty after trimming
    #[error("Question is empty")]
    EmptyQuestion,

    /// The index was built with a different embedding model
    #[error("Index mismatch: {0}")]
    IndexMismatch(String),

    /// Invalid search parameters
    #[error("Invalid search parameters: {0}")]
    InvalidParameters(String),
}

impl From<SearchError> for CrateError {
    fn from(err: SearchError) -> Self {
        CrateError::Search(err.to_string())
    }
}
