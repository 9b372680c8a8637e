//! Ingestion pipeline for RAG
//!
//! This module turns the crawl dataset into a vector index: it loads page
//! text and documents, splits them into overlapping chunks, embeds the chunks
//! batch by batch and publishes the finished index.
//!
//! The index is built in a staging directory next to the published one. Each
//! batch is committed in its own transaction and recorded in the staged
//! manifest, so an interrupted run resumes after the last committed batch when
//! the dataset and settings are unchanged. The published index is only
//! replaced once the new one is complete.

mod chunking;
mod config;
mod error;
mod loader;

pub use chunking::{SEPARATORS, TextChunk, chunk_text};
pub use config::{ChunkOptions, IngestConfig, IngestConfigBuilder};
pub use error::{IngestError, ProcessError};
pub use loader::{
    DocumentMetadata, INGESTED_DOCUMENT_EXTENSIONS, LoadedDataset, SourceDocument,
    docx_xml_to_text, load_dataset, load_docx, load_page, load_pdf,
};

use std::path::{Path, PathBuf};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use rig::embeddings::EmbeddingModel;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::crawler::{DatasetStore, StorageConfig};
use crate::index::{IndexManifest, IndexedChunk, VectorIndex};

/// A chunk with the metadata of its document
#[derive(Debug, Clone)]
pub struct Chunk {
    /// The chunk text and its location
    pub text: TextChunk,

    /// Provenance of the source document
    pub metadata: DocumentMetadata,
}

/// Outcome of an ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Documents loaded
    pub files_loaded: usize,

    /// Files skipped because they could not be loaded
    pub files_skipped: usize,

    /// Chunks in the published index
    pub chunks: usize,

    /// Batches in the published index
    pub batches: usize,

    /// Batches reused from an interrupted run
    pub resumed_batches: usize,

    /// Where the index was published
    pub index_path: PathBuf,
}

/// Split every document into chunks tagged with its metadata
pub fn chunk_documents(
    documents: &[SourceDocument],
    options: &ChunkOptions,
) -> Result<Vec<Chunk>, ProcessError> {
    let mut chunks = Vec::new();
    for document in documents {
        for text in chunk_text(&document.content, options)? {
            chunks.push(Chunk {
                text,
                metadata: document.metadata.clone(),
            });
        }
    }
    Ok(chunks)
}

/// Hex SHA-256 identifying a build: settings plus every chunk in order
pub fn fingerprint(chunks: &[Chunk], config: &IngestConfig, dims: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config.embedding_model.as_bytes());
    hasher.update(dims.to_le_bytes());
    hasher.update(config.chunk_options.chunk_size.to_le_bytes());
    hasher.update(config.chunk_options.overlap.to_le_bytes());
    hasher.update(config.batch_size.to_le_bytes());
    for chunk in chunks {
        hasher.update(chunk.metadata.source.as_bytes());
        hasher.update([0u8]);
        hasher.update(chunk.text.text.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Load, chunk and embed the dataset, then publish the index
#[instrument(skip(embedder, config), fields(dataset = %config.dataset_path.display(), index = %config.index_path.display()))]
pub async fn ingest<E>(embedder: &E, config: &IngestConfig) -> Result<IngestReport, IngestError>
where
    E: EmbeddingModel,
{
    config.chunk_options.validate()?;

    let store = DatasetStore::with_config(StorageConfig {
        base_path: config.dataset_path.clone(),
    });
    let loaded = load_dataset(&store).await?;
    info!(
        "Loaded {} documents ({} skipped)",
        loaded.documents.len(),
        loaded.skipped.len()
    );

    let chunks = chunk_documents(&loaded.documents, &config.chunk_options)?;
    if chunks.is_empty() {
        return Err(IngestError::NoDocuments(
            config.dataset_path.display().to_string(),
        ));
    }

    let dims = embedder.ndims();
    let total_batches = chunks.len().div_ceil(config.batch_size);
    let now = Utc::now();
    let expected = IndexManifest {
        embedding_model: config.embedding_model.clone(),
        dimensions: dims,
        chunk_size: config.chunk_options.chunk_size,
        chunk_overlap: config.chunk_options.overlap,
        batch_size: config.batch_size,
        fingerprint: fingerprint(&chunks, config, dims),
        total_chunks: chunks.len(),
        total_batches,
        batches_committed: 0,
        created_at: now,
        updated_at: now,
    };

    let staging = config.staging_path();
    let (index, mut manifest) = prepare_staging(&staging, expected).await?;
    let resumed_batches = manifest.batches_committed;
    if resumed_batches > 0 {
        info!(
            "Resuming staged index at batch {}/{}",
            resumed_batches, total_batches
        );
    }
    info!(
        "Embedding {} chunks in {} batches",
        chunks.len(),
        total_batches
    );

    let progress = progress_bar(config.show_progress, total_batches, resumed_batches);
    for (batch_no, batch) in chunks
        .chunks(config.batch_size)
        .enumerate()
        .skip(resumed_batches)
    {
        let indexed = embed_batch(embedder, batch).await?;
        index.add_batch(batch_no, &indexed).await?;

        manifest.batches_committed = batch_no + 1;
        manifest.store(&staging).await?;
        progress.inc(1);
        debug!("Batch {}/{} committed", batch_no + 1, total_batches);

        if batch_no + 1 < total_batches && config.batch_pause_ms > 0 {
            tokio::time::sleep(config.batch_pause()).await;
        }
    }
    progress.finish_and_clear();

    let stored = index.count().await?;
    if stored != chunks.len() {
        return Err(IngestError::Publish(format!(
            "staged index holds {} chunks, expected {}",
            stored,
            chunks.len()
        )));
    }
    drop(index);

    publish(&staging, &config.index_path, &config.backup_path()).await?;
    info!(
        "Published index with {} chunks to {}",
        chunks.len(),
        config.index_path.display()
    );

    Ok(IngestReport {
        files_loaded: loaded.documents.len(),
        files_skipped: loaded.skipped.len(),
        chunks: chunks.len(),
        batches: total_batches,
        resumed_batches,
        index_path: config.index_path.clone(),
    })
}

/// Reuse the staged index when it belongs to the same build, otherwise start over
async fn prepare_staging(
    staging: &Path,
    expected: IndexManifest,
) -> Result<(VectorIndex, IndexManifest), IngestError> {
    if let Some(mut staged) = IndexManifest::load_optional(staging).await {
        if staged.same_build(&expected) {
            let index = VectorIndex::create(staging, expected.dimensions).await?;
            // Rows of a batch committed after the last manifest write are redone
            index.discard_batches_from(staged.batches_committed).await?;
            staged.store(staging).await?;
            return Ok((index, staged));
        }
        warn!("Discarding staged index at {}", staging.display());
    }

    if tokio::fs::try_exists(staging).await? {
        tokio::fs::remove_dir_all(staging).await?;
    }
    let index = VectorIndex::create(staging, expected.dimensions).await?;
    let mut manifest = expected;
    manifest.store(staging).await?;
    Ok((index, manifest))
}

/// Embed one batch, splitting it to respect the model's request size
async fn embed_batch<E>(embedder: &E, batch: &[Chunk]) -> Result<Vec<IndexedChunk>, IngestError>
where
    E: EmbeddingModel,
{
    let mut indexed = Vec::with_capacity(batch.len());
    for request in batch.chunks(E::MAX_DOCUMENTS.max(1)) {
        let texts: Vec<String> = request.iter().map(|c| c.text.text.clone()).collect();
        let embeddings = embedder.embed_texts(texts).await?;
        if embeddings.len() != request.len() {
            return Err(IngestError::EmbeddingResponse(format!(
                "requested {} embeddings, received {}",
                request.len(),
                embeddings.len()
            )));
        }

        indexed.extend(request.iter().zip(embeddings).map(|(chunk, embedding)| {
            IndexedChunk {
                text: chunk.text.text.clone(),
                start: chunk.text.start,
                position: chunk.text.position,
                metadata: chunk.metadata.clone(),
                embedding,
            }
        }));
    }
    Ok(indexed)
}

/// Move the staged index into place, keeping the previous one until the swap succeeds
async fn publish(staging: &Path, target: &Path, backup: &Path) -> Result<(), IngestError> {
    if tokio::fs::try_exists(backup).await? {
        tokio::fs::remove_dir_all(backup).await?;
    }

    let had_previous = tokio::fs::try_exists(target).await?;
    if had_previous {
        tokio::fs::rename(target, backup).await?;
    }

    if let Err(e) = tokio::fs::rename(staging, target).await {
        if had_previous {
            tokio::fs::rename(backup, target).await?;
        }
        return Err(IngestError::Publish(format!(
            "could not move {} to {}: {}",
            staging.display(),
            target.display(),
            e
        )));
    }

    if had_previous {
        tokio::fs::remove_dir_all(backup).await?;
    }
    Ok(())
}

fn progress_bar(enabled: bool, total: usize, done: usize) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} batches ({eta}) {msg}")
    {
        progress.set_style(style.progress_chars("##-"));
    }
    progress.set_position(done as u64);
    progress.set_message("Embedding chunks...");
    progress
}
