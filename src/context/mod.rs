//! Context assembly for a question at a playback position.
//!
//! Combines two retrieval paths: semantic similarity over the vector
//! index surfaces topically relevant chunks from anywhere in the video,
//! while a temporal window around the playback position captures what the
//! learner is currently watching even when it is not the closest semantic
//! match (a vague "what does this mean" question). The merged set is
//! deduplicated by chunk identity.

use crate::error::{GraspError, Result};
use crate::store::{ChunkRecord, Database};
use crate::vector_store::{ScoredChunk, VectorIndex};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A chunk selected as context for one question.
///
/// `distance` is present only for semantically retrieved members; chunks
/// pulled in by the temporal window carry `None`.
#[derive(Debug, Clone, Serialize)]
pub struct ContextChunk {
    pub video_id: String,
    pub chunk_index: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub distance: Option<f32>,
}

impl ContextChunk {
    /// Identity of the underlying chunk, for deduplication.
    ///
    /// Compared structurally; never by record value, which would hinge on
    /// float-timestamp equality.
    pub fn key(&self) -> (&str, i64) {
        (&self.video_id, self.chunk_index)
    }

    fn from_scored(video_id: &str, scored: ScoredChunk) -> Self {
        Self {
            video_id: video_id.to_string(),
            chunk_index: scored.chunk_index,
            start_time: scored.start_time,
            end_time: scored.end_time,
            text: scored.text,
            distance: Some(scored.distance),
        }
    }

    fn from_record(record: ChunkRecord) -> Self {
        Self {
            video_id: record.video_id,
            chunk_index: record.chunk_index,
            start_time: record.start_time,
            end_time: record.end_time,
            text: record.text,
            distance: None,
        }
    }
}

/// Assembles the context set for a question.
pub struct ContextAssembler {
    index: Arc<dyn VectorIndex>,
    db: Arc<Database>,
}

impl ContextAssembler {
    /// Create a new assembler over the given stores.
    pub fn new(index: Arc<dyn VectorIndex>, db: Arc<Database>) -> Self {
        Self { index, db }
    }

    /// Build the ordered context set for a question at a playback position.
    ///
    /// Semantic hits come first in similarity order, followed by
    /// temporal-window chunks not already present, in start-time order.
    /// An unavailable index degrades to temporal-only context rather than
    /// failing the request; partial context beats none.
    #[instrument(skip(self, question_embedding))]
    pub async fn assemble(
        &self,
        video_id: &str,
        question_embedding: &[f32],
        current_timestamp: f64,
        window_seconds: f64,
        k: usize,
    ) -> Result<Vec<ContextChunk>> {
        let semantic = match self.index.query(video_id, question_embedding, k).await {
            Ok(hits) => hits
                .into_iter()
                .map(|s| ContextChunk::from_scored(video_id, s))
                .collect(),
            Err(GraspError::IndexUnavailable(msg)) => {
                warn!(
                    "Vector index unavailable for video {}, using temporal context only: {}",
                    video_id, msg
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let window_start = (current_timestamp - window_seconds).max(0.0);
        let window_end = current_timestamp + window_seconds;
        let temporal = self.db.chunks_in_window(video_id, window_start, window_end)?;

        let mut seen: HashSet<(String, i64)> = semantic
            .iter()
            .map(|c| (c.video_id.clone(), c.chunk_index))
            .collect();

        let mut context = semantic;
        for record in temporal {
            if seen.insert((record.video_id.clone(), record.chunk_index)) {
                context.push(ContextChunk::from_record(record));
            }
        }

        debug!(
            "Assembled {} context chunks for video {} at {:.1}s",
            context.len(),
            video_id,
            current_timestamp
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ChunkRecord;
    use crate::vector_store::{IndexEntry, MemoryVectorIndex};
    use async_trait::async_trait;

    fn seeded_db() -> Arc<Database> {
        let db = Database::in_memory().unwrap();
        let chunks: Vec<ChunkRecord> = (0..3)
            .map(|i| ChunkRecord {
                video_id: "vid".to_string(),
                chunk_index: i,
                start_time: i as f64 * 10.0,
                end_time: (i + 1) as f64 * 10.0,
                text: format!("chunk {}", i),
            })
            .collect();
        db.insert_video("vid", "Test", 30, "transcript", &chunks).unwrap();
        Arc::new(db)
    }

    fn entry(index: i64, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk_index: index,
            text: format!("chunk {}", index),
            start_time: index as f64 * 10.0,
            end_time: (index + 1) as f64 * 10.0,
            embedding,
        }
    }

    /// Index double whose queries always fail as unavailable.
    struct DownIndex;

    #[async_trait]
    impl VectorIndex for DownIndex {
        async fn upsert(&self, _: &str, _: &[IndexEntry]) -> crate::error::Result<usize> {
            Err(GraspError::IndexUnavailable("down".into()))
        }
        async fn query(
            &self,
            _: &str,
            _: &[f32],
            _: usize,
        ) -> crate::error::Result<Vec<crate::vector_store::ScoredChunk>> {
            Err(GraspError::IndexUnavailable("down".into()))
        }
        async fn delete(&self, _: &str) -> crate::error::Result<usize> {
            Err(GraspError::IndexUnavailable("down".into()))
        }
        async fn count(&self, _: &str) -> crate::error::Result<usize> {
            Err(GraspError::IndexUnavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn test_temporal_only_when_semantic_empty() {
        let assembler = ContextAssembler::new(Arc::new(MemoryVectorIndex::new()), seeded_db());

        let context = assembler
            .assemble("vid", &[1.0, 0.0], 15.0, 120.0, 5)
            .await
            .unwrap();

        assert_eq!(context.len(), 3);
        assert_eq!(context[0].chunk_index, 0);
        assert_eq!(context[2].chunk_index, 2);
        assert!(context.iter().all(|c| c.distance.is_none()));
    }

    #[tokio::test]
    async fn test_merge_dedupes_by_identity() {
        let index = Arc::new(MemoryVectorIndex::new());
        // Only the last chunk is indexed; the query vector matches it exactly.
        index.upsert("vid", &[entry(2, vec![1.0, 0.0])]).await.unwrap();

        let assembler = ContextAssembler::new(index, seeded_db());
        let context = assembler
            .assemble("vid", &[1.0, 0.0], 15.0, 120.0, 5)
            .await
            .unwrap();

        // Chunk 2 appears exactly once, first, as the semantic entry.
        assert_eq!(context.len(), 3);
        assert_eq!(context[0].chunk_index, 2);
        assert!(context[0].distance.unwrap() < 0.01);
        let twos = context.iter().filter(|c| c.chunk_index == 2).count();
        assert_eq!(twos, 1);
    }

    #[tokio::test]
    async fn test_semantic_precede_temporal() {
        let index = Arc::new(MemoryVectorIndex::new());
        index.upsert("vid", &[entry(1, vec![1.0, 0.0])]).await.unwrap();

        let assembler = ContextAssembler::new(index, seeded_db());
        let context = assembler
            .assemble("vid", &[1.0, 0.0], 15.0, 120.0, 5)
            .await
            .unwrap();

        assert_eq!(context[0].chunk_index, 1);
        assert!(context[0].distance.is_some());
        // Temporal leftovers follow in start-time order.
        assert_eq!(context[1].chunk_index, 0);
        assert_eq!(context[2].chunk_index, 2);
        assert!(context[1].distance.is_none());
    }

    #[tokio::test]
    async fn test_empty_when_both_sets_empty() {
        let assembler = ContextAssembler::new(Arc::new(MemoryVectorIndex::new()), seeded_db());

        // Window far past the video's end
        let context = assembler
            .assemble("vid", &[1.0, 0.0], 10_000.0, 10.0, 5)
            .await
            .unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn test_window_clamps_at_zero() {
        let assembler = ContextAssembler::new(Arc::new(MemoryVectorIndex::new()), seeded_db());

        let context = assembler
            .assemble("vid", &[1.0, 0.0], 2.0, 30.0, 5)
            .await
            .unwrap();
        // Window [0, 32]: chunks 0..=2 have end_times 10, 20, 30
        assert_eq!(context.len(), 3);
    }

    #[tokio::test]
    async fn test_degrades_to_temporal_when_index_down() {
        let assembler = ContextAssembler::new(Arc::new(DownIndex), seeded_db());

        let context = assembler
            .assemble("vid", &[1.0, 0.0], 15.0, 120.0, 5)
            .await
            .unwrap();

        assert_eq!(context.len(), 3);
        assert!(context.iter().all(|c| c.distance.is_none()));
    }
}
