//! Static registry of known AI backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::AIError;

/// Where a backend runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Loopback HTTP server on this machine.
    Local,
    /// Remote API that needs a credential.
    Cloud,
}

impl ProviderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderMode::Local => "local",
            ProviderMode::Cloud => "cloud",
        }
    }
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderMode {
    type Err = AIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ProviderMode::Local),
            "cloud" => Ok(ProviderMode::Cloud),
            other => Err(AIError::InvalidConfiguration(format!(
                "unknown provider mode '{}'",
                other
            ))),
        }
    }
}

/// Incremental payload envelope a backend streams back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireProtocol {
    /// One JSON object per line (`/api/chat`).
    OllamaNdjson,
    /// `data: ` prefixed SSE ending in `[DONE]` (`/chat/completions`).
    OpenAiSse,
    /// Typed SSE events (`/v1/messages`).
    AnthropicSse,
    /// Listed for selection but not wired to a streaming adapter.
    Unsupported,
}

/// Static description of one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub mode: ProviderMode,
    pub default_model: &'static str,
    pub base_url: Option<&'static str>,
    pub known_models: &'static [&'static str],
    pub protocol: WireProtocol,
}

static PROVIDERS: [ProviderDescriptor; 6] = [
    ProviderDescriptor {
        id: "ollama",
        display_name: "Ollama",
        mode: ProviderMode::Local,
        default_model: "gemma3:4b",
        base_url: Some("http://localhost:11434"),
        known_models: &["gemma3:4b", "llama3.2", "llama3.1", "mistral", "codellama"],
        protocol: WireProtocol::OllamaNdjson,
    },
    ProviderDescriptor {
        id: "lmstudio",
        display_name: "LM Studio",
        mode: ProviderMode::Local,
        default_model: "local-model",
        base_url: Some("http://localhost:1234/v1"),
        known_models: &[],
        protocol: WireProtocol::OpenAiSse,
    },
    ProviderDescriptor {
        id: "gpt4all",
        display_name: "GPT4All",
        mode: ProviderMode::Local,
        default_model: "mistral-7b-instruct",
        base_url: Some("http://localhost:4891/v1"),
        known_models: &[],
        protocol: WireProtocol::OpenAiSse,
    },
    ProviderDescriptor {
        id: "openai",
        display_name: "OpenAI",
        mode: ProviderMode::Cloud,
        default_model: "gpt-4o",
        base_url: Some("https://api.openai.com/v1"),
        known_models: &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo"],
        protocol: WireProtocol::OpenAiSse,
    },
    ProviderDescriptor {
        id: "anthropic",
        display_name: "Anthropic",
        mode: ProviderMode::Cloud,
        default_model: "claude-sonnet-4-20250514",
        base_url: Some("https://api.anthropic.com"),
        known_models: &[
            "claude-sonnet-4-20250514",
            "claude-3-5-haiku-20241022",
            "claude-opus-4-20250514",
        ],
        protocol: WireProtocol::AnthropicSse,
    },
    ProviderDescriptor {
        id: "google",
        display_name: "Google AI",
        mode: ProviderMode::Cloud,
        default_model: "gemini-1.5-pro",
        base_url: None,
        known_models: &["gemini-1.5-pro", "gemini-1.5-flash"],
        protocol: WireProtocol::Unsupported,
    },
];

/// All registered backends, local first.
pub fn all_providers() -> &'static [ProviderDescriptor] {
    &PROVIDERS
}

/// Looks up a backend by id.
pub fn lookup(provider_id: &str) -> Option<&'static ProviderDescriptor> {
    PROVIDERS.iter().find(|p| p.id == provider_id)
}

/// Backends of one mode.
pub fn providers_for(mode: ProviderMode) -> impl Iterator<Item = &'static ProviderDescriptor> {
    PROVIDERS.iter().filter(move |p| p.mode == mode)
}

/// Backend used when nothing is configured.
pub fn default_provider() -> &'static ProviderDescriptor {
    &PROVIDERS[0]
}
