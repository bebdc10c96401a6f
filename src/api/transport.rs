//! Transport to the text-generation service.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::error::DecisionError;
use super::types::{GenerateContentRequest, GenerateContentResponse};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends one prompt and returns one text completion.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, DecisionError>;
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiTransport {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiTransport {
    /// Create a transport for the default model.
    pub fn new() -> Result<Self> {
        Self::with_base_url(GEMINI_API_BASE.to_string(), DEFAULT_MODEL.to_string())
    }

    /// Create with custom base URL and model (for testing or other deployments).
    pub fn with_base_url(base_url: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionTransport for GeminiTransport {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, DecisionError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        debug!(url = %url, prompt_chars = prompt.len(), "Requesting completion");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| DecisionError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DecisionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| DecisionError::Transport(format!("Failed to parse completion response: {}", e)))?;

        match body.finish_reason() {
            Some("STOP") | None => {}
            Some(reason) => warn!(reason = reason, "Completion stopped early"),
        }

        Ok(body.text())
    }
}
