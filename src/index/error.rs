//! # Index Error Types Module
//!
//! Error types for the vector index: the libsql database holding chunks and
//! their embeddings, and the manifest describing how it was built.

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for index operations
#[derive(Debug, Error)]
pub enum DbError {
    /// LibSQL error
    #[error("LibSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// SQL query error
    #[error("SQL query error: {0}")]
    Query(String),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Data error
    #[error("Data error: {0}")]
    Data(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The index directory or its database does not exist
    #[error("Index not found at {0}")]
    NotFound(String),

    /// Manifest file error
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Manifest(err.to_string())
    }
}

impl From<DbError> for CrateError {
    fn from(err: DbError) -> Self {
        CrateError::Database(err.to_string())
    }
}
