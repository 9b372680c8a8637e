//! Error types for the unirag crate

use thiserror::Error;

/// Result type for unirag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for unirag operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Dataset storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Document loading or chunking error
    #[error("Process error: {0}")]
    Process(String),

    /// Index build error
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Search error
    #[error("Search error: {0}")]
    Search(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
