//! Ollama chat client.
//!
//! Sends a system + user prompt pair to Ollama's `/api/chat` endpoint and
//! returns the assistant message. JSON mode is requested so module replies
//! can be parsed into structured output.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// A text generation backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Returns the model's reply to `prompt` under the `system` instructions.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Configuration for the Ollama client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    /// HTTP request timeout. The orchestrator's per-module timeout is usually shorter.
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.2,
            timeout_seconds: 120,
        }
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

pub struct OllamaClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        info!(
            "Initializing Ollama client with model {} at {}",
            config.model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = OllamaChatRequest {
            model: &self.config.model_name,
            messages: vec![ChatMessage::system(system), ChatMessage::user(prompt)],
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending chat request ({} prompt bytes)", prompt.len());

        let response = self
            .http_client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after {}s", self.config.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.config.ollama_url
                    )
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(chat_response.message.content)
    }
}
