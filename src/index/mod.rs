//! Vector index for RAG
//!
//! An index is a directory holding a libsql database of chunks with their
//! embeddings plus a `manifest.json` describing the build. The ingestion step
//! writes it; the query service opens it and searches it.

mod database;
pub mod error;
mod manifest;
mod schema;

pub use database::{DATABASE_FILE, VectorIndex};
pub use error::DbError;
pub use manifest::{IndexManifest, MANIFEST_FILE};

use std::path::Path;

use rig::embeddings::Embedding;
use serde::Serialize;

use crate::processor::DocumentMetadata;

/// A chunk ready to be stored
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// Text of the chunk
    pub text: String,

    /// Character offset in the source document
    pub start: usize,

    /// Index of the chunk within its document
    pub position: usize,

    /// Provenance of the source document
    pub metadata: DocumentMetadata,

    /// Embedding of the text
    pub embedding: Embedding,
}

/// A chunk returned by similarity search
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    /// Text of the chunk
    pub text: String,

    /// Provenance of the source document
    pub metadata: DocumentMetadata,

    /// Index of the chunk within its document
    pub position: usize,

    /// Cosine distance to the query
    pub distance: f64,
}

/// Open a finished index for querying, using its manifest for the dimensions
pub async fn open_published(dir: &Path) -> Result<(VectorIndex, IndexManifest), DbError> {
    let manifest = IndexManifest::load(dir).await?;
    if !manifest.is_complete() {
        return Err(DbError::Data(format!(
            "index at {} is incomplete ({} of {} batches)",
            dir.display(),
            manifest.batches_committed,
            manifest.total_batches
        )));
    }

    let index = VectorIndex::open(dir, manifest.dimensions).await?;
    Ok((index, manifest))
}
