//! AI Provider Port - Interface for streaming LLM backends.
//!
//! This port abstracts every backend (local HTTP servers, cloud REST APIs)
//! behind one streaming contract, so the gateway can drive a completion
//! without knowing the wire format.
//!
//! # Design
//!
//! - Providers yield only human-readable text deltas; envelope fields are
//!   discarded inside the adapter
//! - Malformed incremental payloads are skipped by the adapter, never
//!   surfaced as errors
//! - A provider-specific terminal marker ends the stream normally
//! - Overall time budgets are enforced by the caller, not the provider
//!
//! # Example
//!
//! ```ignore
//! let mut stream = provider.open_stream(ChatRequest::new(messages)).await?;
//! while let Some(delta) = stream.next().await {
//!     print!("{}", delta?);
//! }
//! ```

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;

pub use crate::domain::ai::AIError;
use crate::domain::ai::AIProviderConfig;
use crate::domain::consultation::TurnRole;

/// Text deltas of one completion, ending at the backend's terminal marker.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AIError>> + Send>>;

/// Port for streaming LLM backends.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Opens a streaming completion.
    ///
    /// Fails before any text is produced on request or status errors.
    /// Errors after the stream opened arrive as the final `Err` item.
    async fn open_stream(&self, request: ChatRequest) -> Result<TextStream, AIError>;

    /// Lightweight reachability check. Returns a human-readable status.
    async fn probe(&self) -> Result<String, AIError>;

    /// Get provider information (name, model).
    fn provider_info(&self) -> ProviderInfo;
}

/// Builds a provider for a configuration.
///
/// The gateway asks for a fresh provider whenever the configuration changes,
/// which lets tests substitute scripted backends.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, config: &AIProviderConfig) -> Result<Arc<dyn AIProvider>, AIError>;
}

impl<F> ProviderFactory for F
where
    F: Fn(&AIProviderConfig) -> Result<Arc<dyn AIProvider>, AIError> + Send + Sync,
{
    fn build(&self, config: &AIProviderConfig) -> Result<Arc<dyn AIProvider>, AIError> {
        self(config)
    }
}

/// Role-tagged message list for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// The first message is the framed system prompt, followed by history.
    pub messages: Vec<Message>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Concatenated system instructions, if any.
    pub fn system_prompt(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Messages without system instructions.
    pub fn conversation(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != MessageRole::System)
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
}

impl Message {
    /// Creates a new message.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions (guides model behavior).
    System,
    /// User input.
    User,
    /// Assistant (model) response.
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl From<TurnRole> for MessageRole {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => MessageRole::User,
            TurnRole::Assistant => MessageRole::Assistant,
        }
    }
}

/// Provider information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider id (e.g., "ollama", "anthropic").
    pub name: String,
    /// Model identifier.
    pub model: String,
    /// Endpoint requests go to.
    pub endpoint: String,
}

impl ProviderInfo {
    /// Creates new provider info.
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(Message::system("s").role, MessageRole::System);
        assert_eq!(Message::user("u").role, MessageRole::User);
        assert_eq!(Message::assistant("a").role, MessageRole::Assistant);
    }

    #[test]
    fn message_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn turn_roles_map_onto_message_roles() {
        assert_eq!(MessageRole::from(TurnRole::User), MessageRole::User);
        assert_eq!(MessageRole::from(TurnRole::Assistant), MessageRole::Assistant);
    }

    #[test]
    fn chat_request_splits_system_prompt_from_conversation() {
        let request = ChatRequest::new(vec![
            Message::system("be kind"),
            Message::user("hello"),
            Message::assistant("hi"),
        ]);
        assert_eq!(request.system_prompt().as_deref(), Some("be kind"));
        let roles: Vec<_> = request.conversation().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
    }

    #[test]
    fn chat_request_without_system_message() {
        let request = ChatRequest::new(vec![Message::user("hello")]);
        assert_eq!(request.system_prompt(), None);
    }

    #[test]
    fn closures_act_as_factories() {
        let factory = |_config: &AIProviderConfig| -> Result<Arc<dyn AIProvider>, AIError> {
            Err(AIError::NotImplemented("test".to_string()))
        };
        let result = factory.build(&AIProviderConfig::default());
        assert!(matches!(result, Err(AIError::NotImplemented(_))));
    }

    #[test]
    fn ai_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn AIProvider) {}
        fn _accepts_factory(_factory: &dyn ProviderFactory) {}
    }
}
