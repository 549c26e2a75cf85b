//! SQLite-backed vector index.
//!
//! Stores embeddings as little-endian f32 BLOBs and computes cosine
//! distance in Rust. Fine for per-video transcript volumes; a dedicated
//! vector database can replace this behind the same trait.

use super::{cosine_distance, entry_id, IndexEntry, ScoredChunk, VectorIndex};
use crate::error::{GraspError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunk_vectors (
        id TEXT PRIMARY KEY,
        video_id TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        text TEXT NOT NULL,
        start_time REAL NOT NULL,
        end_time REAL NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunk_vectors_video_id ON chunk_vectors(video_id);
"#;

/// SQLite-based vector index.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
}

impl SqliteVectorIndex {
    /// Open (or create) the index at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| GraspError::IndexUnavailable(e.to_string()))?;

        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| GraspError::IndexUnavailable(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| GraspError::IndexUnavailable(e.to_string()))?;

        info!("Initialized SQLite vector index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| GraspError::IndexUnavailable(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| GraspError::IndexUnavailable(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GraspError::IndexUnavailable(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn unavailable(e: rusqlite::Error) -> GraspError {
        GraspError::IndexUnavailable(e.to_string())
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn upsert(&self, video_id: &str, entries: &[IndexEntry]) -> Result<usize> {
        if entries.is_empty() || entries.iter().any(|e| e.embedding.is_empty()) {
            warn!("No embeddings provided for video {}, skipping upsert", video_id);
            return Ok(0);
        }

        let conn = self.conn()?;
        let tx = conn.unchecked_transaction().map_err(Self::unavailable)?;
        let indexed_at = Utc::now().to_rfc3339();

        for entry in entries {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunk_vectors
                (id, video_id, chunk_index, text, start_time, end_time, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    entry_id(video_id, entry.chunk_index),
                    video_id,
                    entry.chunk_index,
                    entry.text,
                    entry.start_time,
                    entry.end_time,
                    Self::embedding_to_bytes(&entry.embedding),
                    indexed_at,
                ],
            )
            .map_err(Self::unavailable)?;
        }

        tx.commit().map_err(Self::unavailable)?;
        info!("Indexed {} chunks for video {}", entries.len(), video_id);
        Ok(entries.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn query(
        &self,
        video_id: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT chunk_index, text, start_time, end_time, embedding
                FROM chunk_vectors
                WHERE video_id = ?1
                "#,
            )
            .map_err(Self::unavailable)?;

        let rows = stmt
            .query_map(params![video_id], |row| {
                let embedding_bytes: Vec<u8> = row.get(4)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    Self::bytes_to_embedding(&embedding_bytes),
                ))
            })
            .map_err(Self::unavailable)?;

        let mut results: Vec<ScoredChunk> = rows
            .filter_map(|r| r.ok())
            .map(|(chunk_index, text, start_time, end_time, embedding)| ScoredChunk {
                chunk_index,
                text,
                start_time,
                end_time,
                distance: cosine_distance(query_embedding, &embedding),
            })
            .collect();

        // Ascending: smaller distance = more similar
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        debug!("Found {} similar chunks for video {}", results.len(), video_id);
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn delete(&self, video_id: &str) -> Result<usize> {
        let conn = self.conn()?;

        let deleted = conn
            .execute(
                "DELETE FROM chunk_vectors WHERE video_id = ?1",
                params![video_id],
            )
            .map_err(Self::unavailable)?;

        info!("Deleted {} index entries for video {}", deleted, video_id);
        Ok(deleted)
    }

    async fn count(&self, video_id: &str) -> Result<usize> {
        let conn = self.conn()?;

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM chunk_vectors WHERE video_id = ?1",
                params![video_id],
                |row| row.get(0),
            )
            .map_err(Self::unavailable)?;

        Ok(count as usize)
    }
}
