//! Configuration settings for Grasp.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub database: DatabaseSettings,
    pub transcript: TranscriptSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub vector_index: VectorIndexSettings,
    pub chat: ChatSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.grasp".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Relational database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database holding videos, chunks, messages, and notes.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "~/.grasp/learning.db".to_string(),
        }
    }
}

/// Transcript acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Caption language to request.
    pub language: String,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Soft token budget per chunk.
    pub target_tokens: u32,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { target_tokens: 600 }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexSettings {
    /// Vector index provider (sqlite, memory).
    pub provider: String,
    /// Path to the SQLite index (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorIndexSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.grasp/vectors.db".to_string(),
        }
    }
}

/// Answer backend provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerProvider {
    /// OpenAI chat completions (default).
    #[default]
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// Google Gemini.
    Gemini,
}

impl std::str::FromStr for AnswerProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(AnswerProvider::OpenAi),
            "anthropic" | "claude" => Ok(AnswerProvider::Anthropic),
            "gemini" | "google" => Ok(AnswerProvider::Gemini),
            _ => Err(format!("Unknown answer provider: {}", s)),
        }
    }
}

impl std::fmt::Display for AnswerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerProvider::OpenAi => write!(f, "openai"),
            AnswerProvider::Anthropic => write!(f, "anthropic"),
            AnswerProvider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Chat and context assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Answer backend (openai, anthropic, gemini). Selected once at startup.
    pub provider: AnswerProvider,
    /// Model name for the selected backend.
    pub model: String,
    /// Maximum completion tokens.
    pub max_tokens: u32,
    /// Number of semantically similar chunks to retrieve.
    pub top_k: u32,
    /// Half-width of the temporal context window around the playback
    /// position, in seconds.
    pub window_seconds: f64,
    /// Maximum number of prior chat turns included in a prompt.
    pub history_limit: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            provider: AnswerProvider::OpenAi,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2048,
            top_k: 5,
            window_seconds: 120.0,
            history_limit: 10,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GraspError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("grasp")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded relational database path.
    pub fn database_path(&self) -> PathBuf {
        Self::expand_path(&self.database.path)
    }

    /// Get the expanded vector index path.
    pub fn vector_index_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_index.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.chunking.target_tokens, 600);
        assert_eq!(settings.chat.top_k, 5);
        assert_eq!(settings.chat.window_seconds, 120.0);
        assert_eq!(settings.embedding.dimensions, 1536);
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("claude".parse::<AnswerProvider>(), Ok(AnswerProvider::Anthropic));
        assert_eq!("google".parse::<AnswerProvider>(), Ok(AnswerProvider::Gemini));
        assert_eq!("openai".parse::<AnswerProvider>(), Ok(AnswerProvider::OpenAi));
        assert!("llamacpp".parse::<AnswerProvider>().is_err());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [chat]
            provider = "anthropic"
            model = "claude-sonnet-4-20250514"
            "#,
        )
        .unwrap();

        assert_eq!(settings.chat.provider, AnswerProvider::Anthropic);
        assert_eq!(settings.chat.history_limit, 10);
        assert_eq!(settings.chunking.target_tokens, 600);
    }
}
