//! In-memory vector index.
//!
//! Useful for testing and small datasets.

use super::{cosine_distance, entry_id, IndexEntry, ScoredChunk, VectorIndex};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

struct StoredEntry {
    video_id: String,
    entry: IndexEntry,
}

/// In-memory vector index.
pub struct MemoryVectorIndex {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryVectorIndex {
    /// Create a new in-memory index.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, video_id: &str, entries: &[IndexEntry]) -> Result<usize> {
        if entries.is_empty() || entries.iter().any(|e| e.embedding.is_empty()) {
            warn!("No embeddings provided for video {}, skipping upsert", video_id);
            return Ok(0);
        }

        let mut store = self.entries.write().unwrap();
        for entry in entries {
            store.insert(
                entry_id(video_id, entry.chunk_index),
                StoredEntry {
                    video_id: video_id.to_string(),
                    entry: entry.clone(),
                },
            );
        }
        Ok(entries.len())
    }

    async fn query(
        &self,
        video_id: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let store = self.entries.read().unwrap();

        let mut results: Vec<ScoredChunk> = store
            .values()
            .filter(|s| s.video_id == video_id)
            .map(|s| ScoredChunk {
                chunk_index: s.entry.chunk_index,
                text: s.entry.text.clone(),
                start_time: s.entry.start_time,
                end_time: s.entry.end_time,
                distance: cosine_distance(query_embedding, &s.entry.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        Ok(results)
    }

    async fn delete(&self, video_id: &str) -> Result<usize> {
        let mut store = self.entries.write().unwrap();
        let initial_len = store.len();
        store.retain(|_, s| s.video_id != video_id);
        Ok(initial_len - store.len())
    }

    async fn count(&self, video_id: &str) -> Result<usize> {
        let store = self.entries.read().unwrap();
        Ok(store.values().filter(|s| s.video_id == video_id).count())
    }
}
