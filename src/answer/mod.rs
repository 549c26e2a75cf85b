//! Provider-agnostic answer generation.
//!
//! Formats the assembled context into a deterministic system prompt and
//! dispatches to a single configured backend. Backends are interchangeable
//! behind [`AnswerBackend`]; selection happens once at configuration time,
//! never per request, and there is no fallback or retry between providers.

mod anthropic;
mod gemini;
mod openai;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

use crate::config::{AnswerProvider, ChatSettings};
use crate::context::ContextChunk;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// System prompt template for the learning assistant.
const SYSTEM_PROMPT: &str = "You are an AI learning assistant helping a student understand video lectures, particularly on machine learning and technical topics.

Context from video transcript:
{context}

Current timestamp: {current_time}
Video: {video_title}

Guidelines:
- Answer the student's question using the video context provided
- Be technical but clear - explain complex concepts step by step
- If explaining code, provide examples and walk through the logic
- If explaining math, break it down into understandable parts
- Reference specific timestamps when relevant (e.g., \"As mentioned at 5:23...\")
- If the context doesn't contain enough information to answer, say so honestly
- Keep responses focused and concise while being thorough";

/// Fixed sentence used when the context set is empty.
const NO_CONTEXT: &str = "No relevant transcript context available.";

/// A prior exchange in the conversation.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Who spoke a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    /// Label used when rendering history into a prompt.
    fn label(self) -> &'static str {
        match self {
            TurnRole::User => "Student",
            TurnRole::Assistant => "Assistant",
        }
    }

    /// Parse a stored role string; unknown roles read as user turns.
    pub fn from_str_lossy(role: &str) -> Self {
        match role {
            "assistant" => TurnRole::Assistant,
            _ => TurnRole::User,
        }
    }
}

/// Trait for chat-completion backends.
///
/// Every backend receives the same system prompt and user message and
/// returns a single text completion. Failures surface as provider errors
/// and propagate to the caller undecorated.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Generate a completion.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Construct the configured answer backend.
pub fn create_backend(settings: &ChatSettings) -> Result<Arc<dyn AnswerBackend>> {
    let backend: Arc<dyn AnswerBackend> = match settings.provider {
        AnswerProvider::OpenAi => Arc::new(OpenAiBackend::new(&settings.model, settings.max_tokens)),
        AnswerProvider::Anthropic => {
            Arc::new(AnthropicBackend::new(&settings.model, settings.max_tokens)?)
        }
        AnswerProvider::Gemini => Arc::new(GeminiBackend::new(&settings.model)?),
    };
    Ok(backend)
}

/// Format a playback position as `H:MM:SS` when at least an hour in,
/// otherwise `M:SS`.
pub fn format_playback_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Render context chunks as timestamped blocks, in input order.
fn render_context(chunks: &[ContextChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT.to_string();
    }

    chunks
        .iter()
        .map(|chunk| {
            format!(
                "[{} - {}]\n{}",
                format_playback_time(chunk.start_time),
                format_playback_time(chunk.end_time),
                chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_system_prompt(context: &[ContextChunk], video_title: &str, current_timestamp: f64) -> String {
    SYSTEM_PROMPT
        .replace("{context}", &render_context(context))
        .replace("{current_time}", &format_playback_time(current_timestamp))
        .replace("{video_title}", video_title)
}

/// Fold bounded history into the user message.
///
/// Only the most recent `limit` turns are kept, oldest first; anything
/// older is dropped, never summarized.
fn build_user_message(question: &str, history: &[ChatTurn], limit: usize) -> String {
    if history.is_empty() || limit == 0 {
        return question.to_string();
    }

    let start = history.len().saturating_sub(limit);
    let mut history_text = String::new();
    for turn in &history[start..] {
        history_text.push_str(&format!("{}: {}\n\n", turn.role.label(), turn.content));
    }

    format!("Previous conversation:\n{}\nStudent: {}", history_text, question)
}

/// Generates answers from assembled context via the configured backend.
pub struct AnswerGenerator {
    backend: Arc<dyn AnswerBackend>,
    history_limit: usize,
}

impl AnswerGenerator {
    /// Create a generator over a backend.
    pub fn new(backend: Arc<dyn AnswerBackend>, history_limit: usize) -> Self {
        Self {
            backend,
            history_limit,
        }
    }

    /// Answer a question against the given context.
    ///
    /// The context set may be empty; the prompt then carries a fixed
    /// no-context sentence and the backend answers from the question alone.
    #[instrument(skip(self, context, history), fields(backend = self.backend.name()))]
    pub async fn generate(
        &self,
        question: &str,
        context: &[ContextChunk],
        video_title: &str,
        current_timestamp: f64,
        history: &[ChatTurn],
    ) -> Result<String> {
        let system_prompt = build_system_prompt(context, video_title, current_timestamp);
        let user_message = build_user_message(question, history, self.history_limit);

        debug!(
            "Dispatching question with {} context chunks and {} history turns",
            context.len(),
            history.len().min(self.history_limit)
        );

        self.backend.complete(&system_prompt, &user_message).await
    }
}
