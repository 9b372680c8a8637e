//! # Index Schema Module
//!
//! One `chunks` table holds every chunk with its provenance and embedding.
//! The `batch` column records which ingestion batch committed the row, so a
//! resumed build can drop rows from a batch the manifest never acknowledged.

use crate::index::error::DbError;
use libsql::{Connection, params};

/// Create the chunks table for embeddings of `dims` dimensions
pub async fn initialize_schema(conn: &Connection, dims: usize) -> Result<(), DbError> {
    if dims == 0 {
        return Err(DbError::Schema(
            "embedding dimensions must be positive".to_string(),
        ));
    }

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch INTEGER NOT NULL,
                position INTEGER NOT NULL,
                start_offset INTEGER NOT NULL,
                text TEXT NOT NULL,
                source TEXT NOT NULL,
                url TEXT NOT NULL,
                title TEXT NOT NULL,
                embedding F32_BLOB({dims}) NOT NULL
            )"
        ),
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create chunks table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_chunks_batch ON chunks(batch)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on chunks batch: {}", e)))?;

    Ok(())
}
