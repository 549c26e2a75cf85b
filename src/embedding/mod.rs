//! Embedding generation for semantic retrieval.
//!
//! Failures are surfaced as provider errors and abort the operation that
//! requested the embedding; retry policy belongs to the caller.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    ///
    /// Returns one vector per input, in input order. A video's chunks go
    /// through this batch path rather than one call per chunk.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
