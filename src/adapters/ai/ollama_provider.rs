//! Ollama Provider - Implementation of AIProvider for a local Ollama server.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OllamaConfig::new("http://localhost:11434").with_model("llama3.2");
//! let provider = OllamaProvider::new(client, config);
//! ```
//!
//! # Streaming
//!
//! Ollama streams newline-delimited JSON objects. Each object carries a
//! `message.content` delta; the object with `"done": true` ends the stream.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::streaming::{check_probe_status, check_status, decode_lines, send, LineOutcome};
use crate::ports::{AIError, AIProvider, ChatRequest, ProviderInfo, TextStream};

/// Configuration for the Ollama provider.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server root (default: http://localhost:11434).
    pub base_url: String,
    /// Model to use (e.g., "llama3.2", "mistral").
    pub model: String,
}

impl OllamaConfig {
    /// Creates a new configuration for the given server.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: "llama3.2".to_string(),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Ollama API provider implementation.
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
}

impl OllamaProvider {
    /// Creates a new provider sharing the given HTTP client.
    pub fn new(client: Client, config: OllamaConfig) -> Self {
        Self { config, client }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.base_url)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.config.base_url)
    }

    fn to_ollama_request(&self, request: &ChatRequest) -> OllamaRequest {
        OllamaRequest {
            model: self.config.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: true,
        }
    }
}

#[async_trait]
impl AIProvider for OllamaProvider {
    async fn open_stream(&self, request: ChatRequest) -> Result<TextStream, AIError> {
        let body = self.to_ollama_request(&request);
        let response = send(self.client.post(self.chat_url()).json(&body)).await?;
        let response = check_status(response).await?;
        Ok(decode_lines(response, parse_ollama_line))
    }

    async fn probe(&self) -> Result<String, AIError> {
        let response = send(self.client.get(self.tags_url())).await?;
        let response = check_probe_status(response).await?;
        let tags: OllamaTags = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse model list: {}", e)))?;

        let names: Vec<&str> = tags.models.iter().take(5).map(|m| m.name.as_str()).collect();
        Ok(format!("Connected. Available models: {}", names.join(", ")))
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("ollama", &self.config.model, self.chat_url())
    }
}

/// Decodes one NDJSON line.
///
/// ```text
/// {"message":{"role":"assistant","content":"Hel"},"done":false}
/// {"message":{"role":"assistant","content":""},"done":true}
/// ```
fn parse_ollama_line(line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Skip;
    }

    let chunk: OllamaChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed Ollama line");
            return LineOutcome::Skip;
        }
    };

    if let Some(error) = chunk.error {
        return LineOutcome::Failed(AIError::Provider(error));
    }

    let text = chunk
        .message
        .and_then(|m| m.content)
        .filter(|t| !t.is_empty());

    match (text, chunk.done) {
        (Some(text), _) => LineOutcome::Text(text),
        (None, true) => LineOutcome::Done,
        (None, false) => LineOutcome::Skip,
    }
}

// ----- Ollama API Types -----

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChunk {
    message: Option<OllamaDelta>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}
