//! Google Gemini backend.

use super::AnswerBackend;
use crate::error::{GraspError, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::instrument;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Answer backend using the Gemini generateContent API.
pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    /// Create a new backend for the given model.
    ///
    /// Reads `GOOGLE_API_KEY` from the environment.
    pub fn new(model: &str) -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| GraspError::Config("GOOGLE_API_KEY not set".to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl AnswerBackend for GeminiBackend {
    #[instrument(skip_all)]
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            API_BASE, self.model, self.api_key
        );

        let body = json!({
            "system_instruction": {"parts": [{"text": system_prompt}]},
            "contents": [{"role": "user", "parts": [{"text": user_message}]}],
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GraspError::Provider(format!("Gemini API error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GraspError::Provider(format!(
                "Gemini API returned {}: {}",
                status, detail
            )));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GraspError::Provider(format!("Gemini API error: {}", e)))?;

        let parts = data["candidates"][0]["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();

        if text.is_empty() {
            return Err(GraspError::Provider(
                "Empty response from Gemini".to_string(),
            ));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
