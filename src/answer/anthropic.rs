//! Anthropic messages-API backend.

use super::AnswerBackend;
use crate::error::{GraspError, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::instrument;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Answer backend using the Anthropic messages API.
pub struct AnthropicBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    /// Create a new backend for the given model.
    ///
    /// Reads `ANTHROPIC_API_KEY` from the environment.
    pub fn new(model: &str, max_tokens: u32) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| GraspError::Config("ANTHROPIC_API_KEY not set".to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.to_string(),
            max_tokens,
        })
    }
}

#[async_trait]
impl AnswerBackend for AnthropicBackend {
    #[instrument(skip_all)]
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system_prompt,
            "messages": [{"role": "user", "content": user_message}],
        });

        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| GraspError::Provider(format!("Anthropic API error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GraspError::Provider(format!(
                "Anthropic API returned {}: {}",
                status, detail
            )));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GraspError::Provider(format!("Anthropic API error: {}", e)))?;

        data["content"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| GraspError::Provider("Empty response from Anthropic".to_string()))
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
