//! AI backend configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::ai::{AIProviderConfig, ProviderMode, ProviderSelection};

/// AI backend configuration
///
/// Blank fields are filled from the provider registry when converted to an
/// [`AIProviderConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Expected mode; checked against the registry when present
    pub mode: Option<ProviderMode>,

    /// Registry id (ollama, lmstudio, gpt4all, openai, anthropic, google)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model id; registry default when absent
    pub model: Option<String>,

    /// API key for cloud providers
    pub api_key: Option<Secret<String>>,

    /// Endpoint override
    pub base_url: Option<String>,

    /// Overall time budget for one streamed reply, in seconds
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_secs: u64,

    /// Time budget for the reachability probe, in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl AiConfig {
    /// Get stream timeout as Duration
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    /// Get probe timeout as Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }

    /// Selection handed to the registry.
    pub fn to_selection(&self) -> ProviderSelection {
        ProviderSelection {
            mode: self.mode,
            provider_id: self.provider.clone(),
            model_id: self.model.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
        }
    }

    /// Resolve against the provider registry.
    pub fn provider_config(&self) -> Result<AIProviderConfig, ValidationError> {
        AIProviderConfig::resolve(self.to_selection())
            .map_err(|e| ValidationError::InvalidAiProvider(e.to_string()))
    }

    /// Validate AI configuration
    ///
    /// A missing cloud key is not an error here: the application still starts
    /// and the connection test reports it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stream_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("AI__STREAM_TIMEOUT_SECS"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("AI__PROBE_TIMEOUT_SECS"));
        }
        self.provider_config().map(|_| ())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            mode: None,
            provider: default_provider(),
            model: None,
            api_key: None,
            base_url: None,
            stream_timeout_secs: default_stream_timeout(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_stream_timeout() -> u64 {
    120
}

fn default_probe_timeout() -> u64 {
    5
}
