//! Per-video partitioned similarity index.
//!
//! All operations are scoped to a `video_id` partition key carried in the
//! entry metadata; there is one logical collection, never a physical
//! collection per video. Entry identity is `"{video_id}_{chunk_index}"`,
//! so re-upserting an identity replaces the prior entry.

mod memory;
mod sqlite;

pub use memory::MemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

use crate::error::Result;
use async_trait::async_trait;

/// A chunk plus its embedding, ready for indexing.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Position of the chunk within its video (dense, zero-based).
    pub chunk_index: i64,
    /// Chunk text.
    pub text: String,
    /// Start time in seconds.
    pub start_time: f64,
    /// End time in seconds.
    pub end_time: f64,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

/// A similarity query hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Position of the chunk within its video.
    pub chunk_index: i64,
    /// Chunk text.
    pub text: String,
    /// Start time in seconds.
    pub start_time: f64,
    /// End time in seconds.
    pub end_time: f64,
    /// Cosine distance to the query (smaller = more similar).
    pub distance: f32,
}

/// Identity of an entry in the index.
pub fn entry_id(video_id: &str, chunk_index: i64) -> String {
    format!("{}_{}", video_id, chunk_index)
}

/// Trait for vector index implementations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert a video's entries, replacing any prior entry with the same
    /// identity. A logged no-op (returning 0) when `entries` is empty or
    /// any embedding is empty, so a soft upstream embedding failure never
    /// indexes garbage.
    async fn upsert(&self, video_id: &str, entries: &[IndexEntry]) -> Result<usize>;

    /// Query the `k` most similar chunks of a video, ascending by distance.
    ///
    /// Returns fewer than `k` results when fewer exist, and an empty list
    /// when the video has no indexed chunks.
    async fn query(&self, video_id: &str, query_embedding: &[f32], k: usize)
        -> Result<Vec<ScoredChunk>>;

    /// Delete every entry for a video. Idempotent; returns the number of
    /// entries removed.
    async fn delete(&self, video_id: &str) -> Result<usize>;

    /// Number of entries indexed for a video.
    async fn count(&self, video_id: &str) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance (smaller = more similar).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_distance() {
        let a = vec![1.0, 0.0];
        assert!(cosine_distance(&a, &a).abs() < 0.001);
        assert!((cosine_distance(&a, &[0.0, 1.0]) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_entry_id() {
        assert_eq!(entry_id("abc123def45", 7), "abc123def45_7");
    }
}
