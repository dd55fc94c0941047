//! AI Provider Adapters.
//!
//! Implementations of the AIProvider port for the registered backends.
//!
//! ## Available Adapters
//!
//! - `OllamaProvider` - Local Ollama server (NDJSON)
//! - `OpenAIProvider` - OpenAI and OpenAI-compatible local servers (SSE)
//! - `AnthropicProvider` - Anthropic Messages API (typed SSE events)
//! - `MockAIProvider` - Configurable mock for testing
//! - `HttpProviderFactory` - Picks the adapter for a configuration

mod anthropic_provider;
mod factory;
mod mock_provider;
mod ollama_provider;
mod openai_provider;
mod streaming;

pub use anthropic_provider::{AnthropicConfig, AnthropicProvider};
pub use factory::HttpProviderFactory;
pub use mock_provider::{MockAIProvider, MockError, MockProviderFactory, MockResponse};
pub use ollama_provider::{OllamaConfig, OllamaProvider};
pub use openai_provider::{OpenAIConfig, OpenAIProvider};
pub use streaming::{LineBuffer, LineOutcome};
