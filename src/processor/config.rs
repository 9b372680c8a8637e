//! # Ingestion Configuration Module
//!
//! Configuration structures and builders for turning the crawl dataset into a
//! vector index.
//!
//! ## Key Components
//!
//! - `ChunkOptions`: chunk size and overlap, measured in characters
//! - `IngestConfig`: dataset location, index location and batching
//! - `IngestConfigBuilder`: builder for `IngestConfig`
//!
//! Changing the chunk options or the embedding model changes the index
//! fingerprint, so a staged index built with other settings is discarded
//! instead of resumed.

use std::path::PathBuf;
use std::time::Duration;

use crate::processor::error::ProcessError;

/// Configuration for chunking text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOptions {
    /// Maximum size of each chunk in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks, at most
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

impl ChunkOptions {
    /// Reject sizes the splitter cannot honor
    pub fn validate(&self) -> Result<(), ProcessError> {
        if self.chunk_size == 0 {
            return Err(ProcessError::Chunking(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(ProcessError::Chunking(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Configuration for an ingestion run
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Root of the crawl dataset
    pub dataset_path: PathBuf,

    /// Directory the finished index is published to
    pub index_path: PathBuf,

    /// Options for chunking
    pub chunk_options: ChunkOptions,

    /// Chunks embedded and committed together
    pub batch_size: usize,

    /// Pause between embedding batches
    pub batch_pause_ms: u64,

    /// Name of the embedding model, recorded in the manifest
    pub embedding_model: String,

    /// Show a progress bar on stderr
    pub show_progress: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("dataset"),
            index_path: PathBuf::from("index_gsu"),
            chunk_options: ChunkOptions::default(),
            batch_size: 100,
            batch_pause_ms: 0,
            embedding_model: "text-embedding-004".to_string(),
            show_progress: true,
        }
    }
}

impl IngestConfig {
    /// Create a new builder
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::new()
    }

    /// Staging directory next to the index
    pub fn staging_path(&self) -> PathBuf {
        sibling_with_suffix(&self.index_path, "partial")
    }

    /// Where the previous index is parked during the swap
    pub fn backup_path(&self) -> PathBuf {
        sibling_with_suffix(&self.index_path, "old")
    }

    /// Pause between batches
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

fn sibling_with_suffix(path: &std::path::Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index".into());
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Builder for IngestConfig
#[derive(Debug, Default)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: IngestConfig::default(),
        }
    }

    /// Set the dataset root
    pub fn dataset_path(mut self, dataset_path: impl Into<PathBuf>) -> Self {
        self.config.dataset_path = dataset_path.into();
        self
    }

    /// Set the index directory
    pub fn index_path(mut self, index_path: impl Into<PathBuf>) -> Self {
        self.config.index_path = index_path.into();
        self
    }

    /// Set the chunk options
    pub fn chunk_options(mut self, chunk_options: ChunkOptions) -> Self {
        self.config.chunk_options = chunk_options;
        self
    }

    /// Set the chunk size
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_options.chunk_size = chunk_size;
        self
    }

    /// Set the chunk overlap
    pub fn overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_options.overlap = overlap;
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size.max(1);
        self
    }

    /// Set the pause between batches
    pub fn batch_pause_ms(mut self, batch_pause_ms: u64) -> Self {
        self.config.batch_pause_ms = batch_pause_ms;
        self
    }

    /// Set the embedding model name
    pub fn embedding_model(mut self, embedding_model: impl Into<String>) -> Self {
        self.config.embedding_model = embedding_model.into();
        self
    }

    /// Enable or disable the progress bar
    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.config.show_progress = show_progress;
        self
    }

    /// Build the configuration
    pub fn build(self) -> IngestConfig {
        self.config
    }
}
