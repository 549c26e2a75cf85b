//! Configuration module for Grasp.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    AnswerProvider, ChatSettings, ChunkingSettings, DatabaseSettings, EmbeddingSettings,
    GeneralSettings, Settings, TranscriptSettings, VectorIndexSettings,
};
