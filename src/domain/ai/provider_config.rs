//! Active AI backend configuration.

use secrecy::{ExposeSecret, Secret};

use super::registry::{self, ProviderDescriptor, ProviderMode};
use super::AIError;

/// What the caller asked for; blanks are filled from the registry.
#[derive(Debug, Clone, Default)]
pub struct ProviderSelection {
    pub mode: Option<ProviderMode>,
    pub provider_id: String,
    pub model_id: Option<String>,
    pub api_key: Option<Secret<String>>,
    pub base_url: Option<String>,
}

impl ProviderSelection {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: ProviderMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_id = Some(model.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(key.into()));
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

/// One active backend configuration per process.
///
/// Replaced wholesale on reconfiguration; never merged field by field.
#[derive(Debug, Clone)]
pub struct AIProviderConfig {
    mode: ProviderMode,
    provider_id: String,
    model_id: String,
    api_key: Option<Secret<String>>,
    base_url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AIProviderConfig {
    /// Resolves a selection against the registry.
    ///
    /// # Errors
    ///
    /// - `UnknownProvider` if the id is not registered
    /// - `InvalidConfiguration` if the requested mode contradicts the registry
    pub fn resolve(selection: ProviderSelection) -> Result<Self, AIError> {
        let descriptor = registry::lookup(selection.provider_id.trim())
            .ok_or_else(|| AIError::UnknownProvider(selection.provider_id.clone()))?;

        if let Some(mode) = selection.mode {
            if mode != descriptor.mode {
                return Err(AIError::InvalidConfiguration(format!(
                    "provider '{}' is a {} provider, not {}",
                    descriptor.id, descriptor.mode, mode
                )));
            }
        }

        let api_key = selection
            .api_key
            .filter(|key| !key.expose_secret().trim().is_empty());
        let base_url = non_blank(selection.base_url)
            .or_else(|| descriptor.base_url.map(str::to_string))
            .map(|url| url.trim_end_matches('/').to_string());

        Ok(Self {
            mode: descriptor.mode,
            provider_id: descriptor.id.to_string(),
            model_id: non_blank(selection.model_id)
                .unwrap_or_else(|| descriptor.default_model.to_string()),
            api_key,
            base_url,
        })
    }

    fn from_descriptor(descriptor: &ProviderDescriptor) -> Self {
        Self {
            mode: descriptor.mode,
            provider_id: descriptor.id.to_string(),
            model_id: descriptor.default_model.to_string(),
            api_key: None,
            base_url: descriptor.base_url.map(str::to_string),
        }
    }

    pub fn mode(&self) -> ProviderMode {
        self.mode
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn api_key(&self) -> Option<&Secret<String>> {
        self.api_key.as_ref()
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn descriptor(&self) -> Option<&'static ProviderDescriptor> {
        registry::lookup(&self.provider_id)
    }

    /// Known models for the configured backend.
    pub fn available_models(&self) -> &'static [&'static str] {
        self.descriptor().map(|d| d.known_models).unwrap_or(&[])
    }

    /// Fails with `CredentialRequired` for a cloud backend without a key.
    pub fn require_credential(&self) -> Result<(), AIError> {
        if self.mode == ProviderMode::Cloud && !self.has_credential() {
            return Err(AIError::CredentialRequired {
                provider: self.provider_id.clone(),
            });
        }
        Ok(())
    }
}

impl Default for AIProviderConfig {
    fn default() -> Self {
        Self::from_descriptor(registry::default_provider())
    }
}
