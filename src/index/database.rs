//! Database operations for the vector index

use std::path::{Path, PathBuf};

use libsql::{Connection, Row, params};
use tracing::{debug, instrument};

use crate::index::error::DbError;
use crate::index::schema;
use crate::index::{IndexedChunk, RetrievedChunk};
use crate::model::embedding::{EmbeddingConversion, f32_blob};
use crate::processor::DocumentMetadata;

/// Name of the database file inside an index directory
pub const DATABASE_FILE: &str = "index.db";

/// Chunk store with cosine-distance search
#[derive(Clone)]
pub struct VectorIndex {
    conn: Connection,
    dims: usize,
}

impl VectorIndex {
    /// Create (or reopen for appending) an index in `dir`
    #[instrument]
    pub async fn create(dir: &Path, dims: usize) -> Result<Self, DbError> {
        tokio::fs::create_dir_all(dir).await?;
        Self::connect(dir.join(DATABASE_FILE), dims).await
    }

    /// Open an existing index read-write. Fails if the directory holds no database.
    #[instrument]
    pub async fn open(dir: &Path, dims: usize) -> Result<Self, DbError> {
        let path = dir.join(DATABASE_FILE);
        if !tokio::fs::try_exists(&path).await? {
            return Err(DbError::NotFound(dir.display().to_string()));
        }
        Self::connect(path, dims).await
    }

    async fn connect(path: PathBuf, dims: usize) -> Result<Self, DbError> {
        let db = libsql::Builder::new_local(&path)
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))?;

        schema::initialize_schema(&conn, dims).await?;
        Ok(Self { conn, dims })
    }

    /// Embedding dimensions of this index
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Insert one batch of chunks in a single transaction
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn add_batch(&self, batch: usize, chunks: &[IndexedChunk]) -> Result<(), DbError> {
        for chunk in chunks {
            if chunk.embedding.vec.len() != self.dims {
                return Err(DbError::Data(format!(
                    "embedding has {} dimensions, index expects {}",
                    chunk.embedding.vec.len(),
                    self.dims
                )));
            }
        }

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to start transaction: {}", e)))?;

        for chunk in chunks {
            tx.execute(
                "INSERT INTO chunks (batch, position, start_offset, text, source, url, title, embedding)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    batch as i64,
                    chunk.position as i64,
                    chunk.start as i64,
                    chunk.text.clone(),
                    chunk.metadata.source.clone(),
                    chunk.metadata.url.clone(),
                    chunk.metadata.title.clone(),
                    libsql::Value::Blob(chunk.embedding.to_blob()),
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to add chunk: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to commit transaction: {}", e)))?;

        debug!("Committed batch {} with {} chunks", batch, chunks.len());
        Ok(())
    }

    /// Delete rows written by batch `batch` or later
    pub async fn discard_batches_from(&self, batch: usize) -> Result<u64, DbError> {
        self.conn
            .execute("DELETE FROM chunks WHERE batch >= ?", params![batch as i64])
            .await
            .map_err(|e| DbError::Query(format!("Failed to delete chunks: {}", e)))
    }

    /// Number of stored chunks
    pub async fn count(&self) -> Result<usize, DbError> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM chunks", params![])
            .await
            .map_err(|e| DbError::Query(format!("Failed to count chunks: {}", e)))?;

        let count: i64 = match rows.next().await? {
            Some(row) => row
                .get(0)
                .map_err(|e| DbError::Data(format!("Failed to get count: {}", e)))?,
            None => 0,
        };
        Ok(count as usize)
    }

    /// The `k` chunks closest to `query` by cosine distance, nearest first
    #[instrument(skip(self, query))]
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>, DbError> {
        if query.len() != self.dims {
            return Err(DbError::Data(format!(
                "query has {} dimensions, index expects {}",
                query.len(),
                self.dims
            )));
        }

        let mut rows = self
            .conn
            .query(
                "SELECT text, source, url, title, position,
                        vector_distance_cos(embedding, ?) AS distance
                 FROM chunks
                 ORDER BY distance ASC
                 LIMIT ?",
                params![libsql::Value::Blob(f32_blob(query)), k as i64],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to search chunks: {}", e)))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(row_to_retrieved(&row)?);
        }
        Ok(results)
    }
}

fn row_to_retrieved(row: &Row) -> Result<RetrievedChunk, DbError> {
    let position: i64 = row
        .get(4)
        .map_err(|e| DbError::Data(format!("Failed to get position: {}", e)))?;

    Ok(RetrievedChunk {
        text: row
            .get(0)
            .map_err(|e| DbError::Data(format!("Failed to get text: {}", e)))?,
        metadata: DocumentMetadata {
            source: row
                .get(1)
                .map_err(|e| DbError::Data(format!("Failed to get source: {}", e)))?,
            url: row
                .get(2)
                .map_err(|e| DbError::Data(format!("Failed to get url: {}", e)))?,
            title: row
                .get(3)
                .map_err(|e| DbError::Data(format!("Failed to get title: {}", e)))?,
        },
        position: position as usize,
        distance: row
            .get(5)
            .map_err(|e| DbError::Data(format!("Failed to get distance: {}", e)))?,
    })
}
