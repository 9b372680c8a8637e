//! Error types for the processor module

use crate::error::Error as CrateError;
use crate::index::DbError;
use thiserror::Error;

/// Error loading or chunking one source file. Never fatal to a run.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Reading the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file could not be parsed into text
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    /// Chunking error
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Error during task joining
    #[error("Task join error: {0}")]
    TaskJoin(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl ProcessError {
    /// Parse failure for a path
    pub fn parse(path: impl AsRef<std::path::Path>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }
}

impl From<ProcessError> for CrateError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Io(e) => CrateError::Io(e),
            _ => CrateError::Process(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ProcessError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(format!("Failed to join task: {}", err))
    }
}

/// Error that aborts an ingestion run
#[derive(Debug, Error)]
pub enum IngestError {
    /// No source file could be loaded
    #[error("No documents could be loaded from {0}")]
    NoDocuments(String),

    /// The embedding service failed
    #[error("Embedding error: {0}")]
    Embedding(#[from] rig::embeddings::EmbeddingError),

    /// The embedding service returned an unusable response
    #[error("Embedding response error: {0}")]
    EmbeddingResponse(String),

    /// Index database error
    #[error("Index error: {0}")]
    Database(#[from] DbError),

    /// Filesystem error while staging or publishing the index
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid chunking settings or an unreadable dataset
    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    /// Publishing the staged index failed
    #[error("Publish error: {0}")]
    Publish(String),
}

impl From<IngestError> for CrateError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Io(e) => CrateError::Io(e),
            _ => CrateError::Ingest(err.to_string()),
        }
    }
}
