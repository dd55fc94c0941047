//! OpenAI Provider - Implementation of AIProvider for OpenAI-compatible APIs.
//!
//! Serves OpenAI itself and local servers that mimic its chat completions
//! endpoint (LM Studio, GPT4All).
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new("openai", "https://api.openai.com/v1")
//!     .with_model("gpt-4o-mini")
//!     .with_api_key(api_key);
//!
//! let provider = OpenAIProvider::new(client, config);
//! ```
//!
//! # Streaming
//!
//! Uses Server-Sent Events (SSE). Each `data:` line carries a JSON chunk
//! whose `choices[0].delta.content` is the text delta, until the `[DONE]`
//! marker is received.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use super::streaming::{check_probe_status, check_status, decode_lines, send, sse_data, LineOutcome};
use crate::domain::ai::ProviderMode;
use crate::ports::{AIError, AIProvider, ChatRequest, ProviderInfo, TextStream};

/// Configuration for an OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Registry id ("openai", "lmstudio", "gpt4all").
    pub provider_id: String,
    /// Base URL including the version segment (e.g. https://api.openai.com/v1).
    pub base_url: String,
    /// Model to use.
    pub model: String,
    /// Local servers take no key.
    pub mode: ProviderMode,
    /// API key for authentication, when the server wants one.
    api_key: Option<Secret<String>>,
}

impl OpenAIConfig {
    /// Creates a new configuration for a local server.
    pub fn new(provider_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            base_url: base_url.into(),
            model: "gpt-4o-mini".to_string(),
            mode: ProviderMode::Local,
            api_key: None,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the mode.
    pub fn with_mode(mut self, mode: ProviderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: Secret<String>) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret().as_str())
    }
}

/// OpenAI-compatible API provider implementation.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Creates a new provider sharing the given HTTP client.
    pub fn new(client: Client, config: OpenAIConfig) -> Self {
        Self { config, client }
    }

    /// Builds the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.config.base_url)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.config.api_key() {
            Some(key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    /// Converts our request to OpenAI's format.
    fn to_openai_request(&self, request: &ChatRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: self.config.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: true,
        }
    }
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn open_stream(&self, request: ChatRequest) -> Result<TextStream, AIError> {
        let body = self.to_openai_request(&request);
        let builder = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .json(&body);

        let response = send(self.authorize(builder)).await?;
        let response = check_status(response).await?;
        Ok(decode_lines(response, parse_openai_line))
    }

    async fn probe(&self) -> Result<String, AIError> {
        let response = send(self.authorize(self.client.get(self.models_url()))).await?;
        check_probe_status(response).await?;

        Ok(match self.config.mode {
            ProviderMode::Cloud => "Connected to OpenAI".to_string(),
            ProviderMode::Local => "Connected to local server".to_string(),
        })
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new(
            &self.config.provider_id,
            &self.config.model,
            self.completions_url(),
        )
    }
}

/// Decodes one SSE line.
///
/// ```text
/// data: {"choices":[{"delta":{"content":"Hello"}}]}
/// data: [DONE]
/// ```
fn parse_openai_line(line: &str) -> LineOutcome {
    let Some(data) = sse_data(line) else {
        return LineOutcome::Skip;
    };
    let data = data.trim();

    if data == "[DONE]" {
        return LineOutcome::Done;
    }

    let chunk: OpenAIStreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed SSE payload");
            return LineOutcome::Skip;
        }
    };

    if let Some(error) = chunk.error {
        return LineOutcome::Failed(AIError::Provider(
            error.message.unwrap_or_else(|| "Stream error".to_string()),
        ));
    }

    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|t| !t.is_empty())
        .map(LineOutcome::Text)
        .unwrap_or(LineOutcome::Skip)
}

// ----- OpenAI API Types -----

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<StreamErrorContent>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorContent {
    message: Option<String>,
}
