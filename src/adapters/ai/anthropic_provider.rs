//! Anthropic Provider - Implementation of AIProvider for Anthropic's Messages API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = AnthropicConfig::new(api_key)
//!     .with_model("claude-3-5-sonnet-20241022")
//!     .with_base_url("https://api.anthropic.com");
//!
//! let provider = AnthropicProvider::new(client, config);
//! ```
//!
//! # Streaming
//!
//! Anthropic streams typed SSE events. Text arrives in `content_block_delta`
//! events carrying a `text_delta`; `message_stop` ends the stream.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use super::streaming::{check_status, decode_lines, send, sse_data, LineOutcome};
use crate::ports::{AIError, AIProvider, ChatRequest, Message, ProviderInfo, TextStream};

/// Anthropic API version header value.
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Upper bound on reply length.
const MAX_TOKENS: u32 = 4096;

/// Prefix every Anthropic API key carries.
const KEY_PREFIX: &str = "sk-ant-";

/// Configuration for the Anthropic provider.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use.
    pub model: String,
    /// Base URL for the API (default: https://api.anthropic.com).
    pub base_url: String,
}

impl AnthropicConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: Secret<String>) -> Self {
        Self {
            api_key,
            model: "claude-3-5-sonnet-20241022".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Anthropic API provider implementation.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    /// Creates a new provider sharing the given HTTP client.
    pub fn new(client: Client, config: AnthropicConfig) -> Self {
        Self { config, client }
    }

    /// Builds the messages endpoint URL.
    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    /// Converts our request to Anthropic's format.
    ///
    /// System instructions travel in a top-level field rather than as a
    /// message.
    fn to_anthropic_request(&self, request: &ChatRequest) -> AnthropicRequest {
        AnthropicRequest {
            model: self.config.model.clone(),
            messages: request.conversation().map(AnthropicMessage::from).collect(),
            system: request.system_prompt(),
            max_tokens: MAX_TOKENS,
            stream: true,
        }
    }
}

#[async_trait]
impl AIProvider for AnthropicProvider {
    async fn open_stream(&self, request: ChatRequest) -> Result<TextStream, AIError> {
        let body = self.to_anthropic_request(&request);
        let builder = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.config.api_key())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("Content-Type", "application/json")
            .json(&body);

        let response = check_status(send(builder).await?).await?;
        Ok(decode_lines(response, parse_anthropic_line))
    }

    /// Checks the key format only; a real round trip would spend tokens.
    async fn probe(&self) -> Result<String, AIError> {
        if self.config.api_key().starts_with(KEY_PREFIX) {
            Ok("API key format valid for Anthropic".to_string())
        } else {
            Err(AIError::InvalidConfiguration(
                "Invalid Anthropic API key format".to_string(),
            ))
        }
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("anthropic", &self.config.model, self.messages_url())
    }
}

/// Decodes one SSE line.
///
/// The `data:` payload repeats the event type, so `event:` lines are not
/// needed:
/// ```text
/// event: content_block_delta
/// data: {"type":"content_block_delta","delta":{"type":"text_delta","text":"Hello"}}
/// ```
fn parse_anthropic_line(line: &str) -> LineOutcome {
    let Some(data) = sse_data(line) else {
        return LineOutcome::Skip;
    };

    let event: StreamEvent = match serde_json::from_str(data.trim()) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed Anthropic event");
            return LineOutcome::Skip;
        }
    };

    match event.event_type.as_str() {
        "content_block_delta" => event
            .delta
            .filter(|d| d.delta_type.as_deref() == Some("text_delta"))
            .and_then(|d| d.text)
            .filter(|t| !t.is_empty())
            .map(LineOutcome::Text)
            .unwrap_or(LineOutcome::Skip),
        "message_stop" => LineOutcome::Done,
        "error" => LineOutcome::Failed(AIError::Provider(
            event
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Stream error".to_string()),
        )),
        // message_start, content_block_start, ping, message_delta, ...
        _ => LineOutcome::Skip,
    }
}

// ----- Anthropic API Types -----

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

impl From<&Message> for AnthropicMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<TextDelta>,
    error: Option<StreamErrorContent>,
}

#[derive(Debug, Deserialize)]
struct TextDelta {
    #[serde(rename = "type")]
    delta_type: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorContent {
    message: Option<String>,
}
