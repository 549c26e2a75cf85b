//! Pipeline orchestrator for Grasp.
//!
//! Coordinates ingestion (captions -> chunks -> embeddings -> index) and
//! question answering (embed -> assemble context -> generate -> persist).
//!
//! Chunk rows land in the relational store and vector entries in the
//! index as two separate units of work with no cross-store transaction.
//! A failure between them leaves the stores inconsistent; "fully indexed"
//! is therefore a derived, re-checkable condition (`index_status`) with
//! `reindex` as the idempotent repair, not an atomic fact.

use crate::answer::{create_backend, AnswerBackend, AnswerGenerator, ChatTurn, TurnRole};
use crate::chunking::TokenBudgetChunker;
use crate::config::Settings;
use crate::context::{ContextAssembler, ContextChunk};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{GraspError, Result};
use crate::store::{ChunkRecord, Database};
use crate::transcript::{extract_video_id, TranscriptSource, YoutubeCaptions};
use crate::vector_store::{IndexEntry, MemoryVectorIndex, SqliteVectorIndex, VectorIndex};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The main orchestrator for the Grasp pipeline.
pub struct Orchestrator {
    settings: Settings,
    db: Arc<Database>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    source: Arc<dyn TranscriptSource>,
    assembler: ContextAssembler,
    generator: AnswerGenerator,
}

impl Orchestrator {
    /// Create a new orchestrator with providers from configuration.
    ///
    /// Service handles are constructed once here and passed by reference to
    /// the components that need them; nothing is a lazily initialized global.
    pub fn new(settings: Settings) -> Result<Self> {
        let db = Arc::new(Database::new(&settings.database_path())?);

        let index: Arc<dyn VectorIndex> = match settings.vector_index.provider.as_str() {
            "memory" => Arc::new(MemoryVectorIndex::new()),
            _ => Arc::new(SqliteVectorIndex::new(&settings.vector_index_path())?),
        };

        let embedder = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let source = Arc::new(YoutubeCaptions::new(&settings.transcript.language));
        let backend = create_backend(&settings.chat)?;

        Ok(Self::assemble_components(
            settings, db, index, embedder, source, backend,
        ))
    }

    /// Create an orchestrator with custom components (for testing and
    /// alternative providers).
    pub fn with_components(
        settings: Settings,
        db: Arc<Database>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        source: Arc<dyn TranscriptSource>,
        backend: Arc<dyn AnswerBackend>,
    ) -> Self {
        Self::assemble_components(settings, db, index, embedder, source, backend)
    }

    fn assemble_components(
        settings: Settings,
        db: Arc<Database>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        source: Arc<dyn TranscriptSource>,
        backend: Arc<dyn AnswerBackend>,
    ) -> Self {
        let assembler = ContextAssembler::new(index.clone(), db.clone());
        let generator = AnswerGenerator::new(backend, settings.chat.history_limit as usize);

        Self {
            settings,
            db,
            index,
            embedder,
            source,
            assembler,
            generator,
        }
    }

    /// Get a reference to the relational store.
    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load a video: fetch captions, chunk, persist, embed, and index.
    ///
    /// An already-loaded video short-circuits unless `force`, which
    /// deletes and re-ingests. Re-ingestion is also the recovery path when
    /// a previous run failed between the relational and vector writes.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn load_video(&self, input: &str, force: bool) -> Result<LoadResult> {
        let video_id = extract_video_id(input).ok_or_else(|| {
            GraspError::InvalidInput(format!("Could not extract a video ID from: {}", input))
        })?;

        if let Some(existing) = self.db.get_video(&video_id)? {
            if !force {
                info!("Video {} is already loaded, skipping", video_id);
                return Ok(LoadResult {
                    video_id,
                    title: existing.title,
                    duration: existing.duration,
                    chunk_count: self.db.chunk_count(&existing.id)?,
                    skipped: true,
                });
            }
            self.delete_video(&video_id).await?;
        }

        info!("Fetching transcript for {}", video_id);
        let transcript = self.source.fetch(&video_id).await?;

        let chunker = TokenBudgetChunker::new(self.settings.chunking.target_tokens);
        let chunks: Vec<ChunkRecord> = chunker
            .chunk(&transcript.segments)
            .into_iter()
            .enumerate()
            .map(|(i, draft)| ChunkRecord {
                video_id: video_id.clone(),
                chunk_index: i as i64,
                start_time: draft.start_time,
                end_time: draft.end_time,
                text: draft.text,
            })
            .collect();

        self.db.insert_video(
            &video_id,
            &transcript.title,
            transcript.duration_seconds,
            &transcript.full_text(),
            &chunks,
        )?;

        // From here on the relational rows are committed; an embedding or
        // upsert failure leaves the index behind them (see module docs).
        let indexed = self.embed_and_index(&video_id, &chunks).await?;

        Ok(LoadResult {
            video_id,
            title: transcript.title,
            duration: transcript.duration_seconds,
            chunk_count: indexed,
            skipped: false,
        })
    }

    /// Embed chunk texts in one batch and upsert them into the index.
    async fn embed_and_index(&self, video_id: &str, chunks: &[ChunkRecord]) -> Result<usize> {
        if chunks.is_empty() {
            warn!("Video {} produced no chunks, nothing to index", video_id);
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry {
                chunk_index: chunk.chunk_index,
                text: chunk.text.clone(),
                start_time: chunk.start_time,
                end_time: chunk.end_time,
                embedding,
            })
            .collect();

        self.index.upsert(video_id, &entries).await
    }

    /// Answer a question about a video at a playback position.
    ///
    /// Persists the question and the answer as a message pair, each
    /// carrying the context chunk indices that informed the answer.
    #[instrument(skip(self, question), fields(video_id = %video_id))]
    pub async fn answer(
        &self,
        video_id: &str,
        question: &str,
        current_timestamp: f64,
    ) -> Result<AnswerOutcome> {
        let video = self
            .db
            .get_video(video_id)?
            .ok_or_else(|| GraspError::NotFound(format!("Video {}", video_id)))?;

        let question_embedding = self.embedder.embed(question).await?;

        let context = self
            .assembler
            .assemble(
                video_id,
                &question_embedding,
                current_timestamp,
                self.settings.chat.window_seconds,
                self.settings.chat.top_k as usize,
            )
            .await?;

        let history: Vec<ChatTurn> = self
            .db
            .chat_history(video_id)?
            .into_iter()
            .map(|m| ChatTurn {
                role: TurnRole::from_str_lossy(&m.role),
                content: m.content,
            })
            .collect();

        let answer = self
            .generator
            .generate(question, &context, &video.title, current_timestamp, &history)
            .await?;

        let context_ids: Vec<i64> = context.iter().map(|c| c.chunk_index).collect();
        self.db
            .insert_message(video_id, current_timestamp, "user", question, &context_ids)?;
        self.db
            .insert_message(video_id, current_timestamp, "assistant", &answer, &context_ids)?;

        Ok(AnswerOutcome { answer, context })
    }

    /// Check whether a video's index entries match its relational chunks.
    pub async fn index_status(&self, video_id: &str) -> Result<IndexStatus> {
        if !self.db.video_exists(video_id)? {
            return Err(GraspError::NotFound(format!("Video {}", video_id)));
        }

        let chunk_rows = self.db.chunk_count(video_id)?;
        let indexed = self.index.count(video_id).await?;

        Ok(IndexStatus {
            chunk_rows,
            indexed,
            in_sync: chunk_rows == indexed,
        })
    }

    /// Re-embed and re-upsert every persisted chunk of a video.
    ///
    /// Idempotent repair for a partially indexed video; stale entries are
    /// dropped first so the index ends up exactly mirroring the chunks.
    #[instrument(skip(self))]
    pub async fn reindex(&self, video_id: &str) -> Result<usize> {
        if !self.db.video_exists(video_id)? {
            return Err(GraspError::NotFound(format!("Video {}", video_id)));
        }

        let chunks = self.db.chunks_for_video(video_id)?;
        self.index.delete(video_id).await?;
        self.embed_and_index(video_id, &chunks).await
    }

    /// Delete a video: its index partition, then the relational record.
    #[instrument(skip(self))]
    pub async fn delete_video(&self, video_id: &str) -> Result<()> {
        self.index.delete(video_id).await?;

        if !self.db.delete_video(video_id)? {
            return Err(GraspError::NotFound(format!("Video {}", video_id)));
        }

        info!("Deleted video {}", video_id);
        Ok(())
    }
}

/// Result of loading a video.
#[derive(Debug)]
pub struct LoadResult {
    /// Video ID.
    pub video_id: String,
    /// Title.
    pub title: String,
    /// Duration in seconds.
    pub duration: i64,
    /// Number of chunks indexed (or already present when skipped).
    pub chunk_count: usize,
    /// Whether loading was skipped (already loaded).
    pub skipped: bool,
}

/// Result of answering a question.
#[derive(Debug)]
pub struct AnswerOutcome {
    /// The generated answer.
    pub answer: String,
    /// Context chunks the answer was grounded in.
    pub context: Vec<ContextChunk>,
}

/// Derived indexing state of a video.
#[derive(Debug, Clone, Copy)]
pub struct IndexStatus {
    /// Chunk rows in the relational store.
    pub chunk_rows: usize,
    /// Entries in the vector index.
    pub indexed: usize,
    /// Whether the two agree.
    pub in_sync: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::AnswerBackend;
    use crate::transcript::{TranscriptSegment, VideoTranscript};
    use async_trait::async_trait;

    const VIDEO_ID: &str = "abcdefghij1";

    struct FakeSource;

    #[async_trait]
    impl TranscriptSource for FakeSource {
        async fn fetch(&self, video_id: &str) -> Result<VideoTranscript> {
            Ok(VideoTranscript {
                video_id: video_id.to_string(),
                title: "Backprop Explained".to_string(),
                duration_seconds: 30,
                segments: vec![
                    TranscriptSegment::new("Gradients flow backwards", 0.0, 10.0),
                    TranscriptSegment::new("through the chain rule", 10.0, 10.0),
                    TranscriptSegment::new("updating every weight", 20.0, 10.0),
                ],
            })
        }
    }

    /// Deterministic embedder: vector encodes the text length.
    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
        fn dimensions(&self) -> usize {
            2
        }
    }

    struct StaticBackend;

    #[async_trait]
    impl AnswerBackend for StaticBackend {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok("The chain rule.".to_string())
        }
        fn name(&self) -> &'static str {
            "static"
        }
    }

    fn test_orchestrator() -> Orchestrator {
        let mut settings = Settings::default();
        settings.chunking.target_tokens = 600;

        Orchestrator::with_components(
            settings,
            Arc::new(Database::in_memory().unwrap()),
            Arc::new(MemoryVectorIndex::new()),
            Arc::new(FakeEmbedder),
            Arc::new(FakeSource),
            Arc::new(StaticBackend),
        )
    }

    #[tokio::test]
    async fn test_load_video_persists_and_indexes() {
        let orchestrator = test_orchestrator();

        let result = orchestrator.load_video(VIDEO_ID, false).await.unwrap();
        assert_eq!(result.video_id, VIDEO_ID);
        assert!(!result.skipped);
        assert!(result.chunk_count > 0);

        let status = orchestrator.index_status(VIDEO_ID).await.unwrap();
        assert!(status.in_sync);
        assert_eq!(status.chunk_rows, result.chunk_count);
    }

    #[tokio::test]
    async fn test_load_video_skips_when_already_loaded() {
        let orchestrator = test_orchestrator();

        let first = orchestrator.load_video(VIDEO_ID, false).await.unwrap();
        let second = orchestrator.load_video(VIDEO_ID, false).await.unwrap();

        assert!(second.skipped);
        assert_eq!(second.chunk_count, first.chunk_count);
    }

    #[tokio::test]
    async fn test_load_video_rejects_bad_input() {
        let orchestrator = test_orchestrator();

        assert!(matches!(
            orchestrator.load_video("definitely not a video", false).await,
            Err(GraspError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_answer_persists_message_pair() {
        let orchestrator = test_orchestrator();
        orchestrator.load_video(VIDEO_ID, false).await.unwrap();

        let outcome = orchestrator
            .answer(VIDEO_ID, "How do gradients propagate?", 15.0)
            .await
            .unwrap();
        assert_eq!(outcome.answer, "The chain rule.");
        assert!(!outcome.context.is_empty());

        let history = orchestrator.database().chat_history(VIDEO_ID).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
        assert_eq!(history[1].content, "The chain rule.");
        assert_eq!(
            history[0].context_chunks,
            outcome.context.iter().map(|c| c.chunk_index).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_answer_unknown_video_not_found() {
        let orchestrator = test_orchestrator();

        assert!(matches!(
            orchestrator.answer("kkkkkkkkkkk", "hi", 0.0).await,
            Err(GraspError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reindex_repairs_missing_entries() {
        let orchestrator = test_orchestrator();
        orchestrator.load_video(VIDEO_ID, false).await.unwrap();

        // Knock the index out from under the relational store.
        orchestrator.index.delete(VIDEO_ID).await.unwrap();
        let status = orchestrator.index_status(VIDEO_ID).await.unwrap();
        assert!(!status.in_sync);

        let restored = orchestrator.reindex(VIDEO_ID).await.unwrap();
        assert_eq!(restored, status.chunk_rows);
        assert!(orchestrator.index_status(VIDEO_ID).await.unwrap().in_sync);
    }

    #[tokio::test]
    async fn test_delete_video_clears_both_stores() {
        let orchestrator = test_orchestrator();
        orchestrator.load_video(VIDEO_ID, false).await.unwrap();

        orchestrator.delete_video(VIDEO_ID).await.unwrap();
        assert!(!orchestrator.database().video_exists(VIDEO_ID).unwrap());
        assert_eq!(orchestrator.index.count(VIDEO_ID).await.unwrap(), 0);

        assert!(matches!(
            orchestrator.delete_video(VIDEO_ID).await,
            Err(GraspError::NotFound(_))
        ));
    }
}
