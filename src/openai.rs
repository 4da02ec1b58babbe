//! OpenAI chat-completion client
//!
//! Provides the LLM call behind the summarizer.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::config::CompletionConfig;
use crate::error::InsightError;
use crate::models::{ChatCompletionResponse, ChatMessage};
use crate::summarizer::CompletionProvider;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

/// Reusable chat-completion client (connection-pooled)
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    store: bool,
}

impl OpenAiClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                InsightError::ConfigError(format!("Failed to build completion HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            store: config.store,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            store: self.store,
        };

        info!(model = %self.model, "Calling chat completion API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Chat completion request failed: {}", e);
                InsightError::CompletionError(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Chat completion error response: {}", error_text);
            return Err(InsightError::CompletionError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat completion response: {}", e);
            InsightError::CompletionError(format!("decode failed: {}", e))
        })?;

        info!(choices = completion.choices.len(), "Chat completion received");

        Ok(completion)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    store: bool,
}
