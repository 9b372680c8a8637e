//! Build manifest stored next to the index database.
//!
//! The manifest is rewritten after every committed batch. Writes go to a
//! temporary file that is renamed into place, so a reader never sees a
//! half-written manifest.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::index::error::DbError;

/// Name of the manifest file inside an index directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// How an index was built and how far the build got
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Embedding model that produced the vectors
    pub embedding_model: String,

    /// Embedding dimensions
    pub dimensions: usize,

    /// Chunk size in characters
    pub chunk_size: usize,

    /// Chunk overlap in characters
    pub chunk_overlap: usize,

    /// Chunks per batch
    pub batch_size: usize,

    /// Hex SHA-256 over the settings and every chunk, in order
    pub fingerprint: String,

    /// Chunks in the finished index
    pub total_chunks: usize,

    /// Batches in the finished index
    pub total_batches: usize,

    /// Batches committed so far
    pub batches_committed: usize,

    /// When the build started
    pub created_at: DateTime<Utc>,

    /// When the manifest was last written
    pub updated_at: DateTime<Utc>,
}

impl IndexManifest {
    /// Whether every batch has been committed
    pub fn is_complete(&self) -> bool {
        self.batches_committed >= self.total_batches
    }

    /// Whether `other` describes the same build, so its progress can be reused
    pub fn same_build(&self, other: &IndexManifest) -> bool {
        self.fingerprint == other.fingerprint
            && self.embedding_model == other.embedding_model
            && self.dimensions == other.dimensions
            && self.batch_size == other.batch_size
    }

    /// Read `manifest.json` from an index directory
    pub async fn load(dir: &Path) -> Result<Self, DbError> {
        let path = dir.join(MANIFEST_FILE);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DbError::NotFound(path.display().to_string()),
            _ => DbError::Io(e),
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read the manifest if there is one; unreadable manifests count as absent
    pub async fn load_optional(dir: &Path) -> Option<Self> {
        match Self::load(dir).await {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                debug!("No usable manifest in {}: {}", dir.display(), e);
                None
            }
        }
    }

    /// Atomically write the manifest into `dir`, stamping `updated_at`
    pub async fn store(&mut self, dir: &Path) -> Result<(), DbError> {
        self.updated_at = Utc::now();
        let content = serde_json::to_string_pretty(self)?;

        let tmp = dir.join(format!("{}.tmp", MANIFEST_FILE));
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, dir.join(MANIFEST_FILE)).await?;
        Ok(())
    }
}
