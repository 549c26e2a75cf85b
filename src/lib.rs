//! Grasp - Learn from videos
//!
//! A backend for studying video lectures: load a video's transcript, ask
//! questions anchored to your current playback position, and keep
//! timestamped notes.
//!
//! # Overview
//!
//! Grasp allows you to:
//! - Load a YouTube video's captions and index them for retrieval
//! - Chat about the video with answers grounded in the transcript
//! - Combine semantic search with a window around the playback position
//! - Keep timestamped notes per video
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `transcript` - Caption acquisition and the timed-segment model
//! - `chunking` - Token-budget transcript chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Per-video partitioned similarity index
//! - `store` - Relational storage for videos, chunks, messages, and notes
//! - `context` - Context assembly for a question at a playback position
//! - `answer` - Provider-agnostic answer generation
//! - `orchestrator` - Pipeline coordination
//! - `server` - HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use grasp::config::Settings;
//! use grasp::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let result = orchestrator
//!         .load_video("https://youtube.com/watch?v=dQw4w9WgXcQ", false)
//!         .await?;
//!     println!("Indexed {} chunks", result.chunk_count);
//!
//!     let outcome = orchestrator
//!         .answer(&result.video_id, "What does this mean?", 42.0)
//!         .await?;
//!     println!("{}", outcome.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod server;
pub mod store;
pub mod transcript;
pub mod vector_store;

pub use error::{GraspError, Result};
