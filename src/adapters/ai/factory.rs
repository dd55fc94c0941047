//! Builds HTTP provider adapters from the active configuration.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use super::anthropic_provider::{AnthropicConfig, AnthropicProvider};
use super::ollama_provider::{OllamaConfig, OllamaProvider};
use super::openai_provider::{OpenAIConfig, OpenAIProvider};
use crate::domain::ai::{AIProviderConfig, WireProtocol};
use crate::ports::{AIError, AIProvider, ProviderFactory};

/// Connect timeout for every backend. Read time is bounded by the gateway.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maps registry entries onto the adapter that speaks their wire protocol.
///
/// One pooled HTTP client is shared by every adapter built here.
#[derive(Debug, Clone)]
pub struct HttpProviderFactory {
    client: Client,
}

impl HttpProviderFactory {
    /// Creates a factory with a fresh HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, AIError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AIError::InvalidConfiguration(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Creates a factory around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn build(&self, config: &AIProviderConfig) -> Result<Arc<dyn AIProvider>, AIError> {
        let descriptor = config
            .descriptor()
            .ok_or_else(|| AIError::UnknownProvider(config.provider_id().to_string()))?;

        let not_implemented = || AIError::NotImplemented(descriptor.display_name.to_string());
        let base_url = config.base_url().ok_or_else(not_implemented)?.to_string();

        let provider: Arc<dyn AIProvider> = match descriptor.protocol {
            WireProtocol::OllamaNdjson => Arc::new(OllamaProvider::new(
                self.client.clone(),
                OllamaConfig::new(base_url).with_model(config.model_id()),
            )),
            WireProtocol::OpenAiSse => {
                let mut openai = OpenAIConfig::new(config.provider_id(), base_url)
                    .with_model(config.model_id())
                    .with_mode(config.mode());
                if let Some(key) = config.api_key() {
                    openai = openai.with_api_key(key.clone());
                }
                Arc::new(OpenAIProvider::new(self.client.clone(), openai))
            }
            WireProtocol::AnthropicSse => {
                let key = config
                    .api_key()
                    .cloned()
                    .ok_or_else(|| AIError::CredentialRequired {
                        provider: config.provider_id().to_string(),
                    })?;
                Arc::new(AnthropicProvider::new(
                    self.client.clone(),
                    AnthropicConfig::new(key)
                        .with_model(config.model_id())
                        .with_base_url(base_url),
                ))
            }
            WireProtocol::Unsupported => return Err(not_implemented()),
        };

        tracing::debug!(
            provider = config.provider_id(),
            model = config.model_id(),
            "Built AI provider"
        );
        Ok(provider)
    }
}
