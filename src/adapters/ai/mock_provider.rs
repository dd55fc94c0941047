//! Mock AI Provider for testing.
//!
//! Provides a configurable mock implementation of the AIProvider port,
//! allowing tests to run without a language-model backend.
//!
//! # Features
//!
//! - Scripted replies split into fragments
//! - Failures before or part-way through a stream
//! - Simulated per-fragment delays for timeout testing
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_reply(&["Hello", " world"])
//!     .with_delay(Duration::from_millis(10));
//!
//! let gateway = AiGateway::new(config, Arc::new(provider.factory()), settings);
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::ai::AIProviderConfig;
use crate::ports::{AIError, AIProvider, ChatRequest, ProviderFactory, ProviderInfo, TextStream};

/// Mock AI provider for testing.
///
/// Replies are consumed in order; once the queue is empty every request
/// gets a single "Mock response" fragment.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Pre-configured replies (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Provider info to return.
    info: ProviderInfo,
    /// Simulated latency before each fragment.
    delay: Duration,
    /// Result of `probe`.
    probe: Result<String, AIError>,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<ChatRequest>>>,
}

/// A configured mock reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Stream these fragments, then end normally.
    Fragments(Vec<String>),
    /// Stream these fragments, then fail.
    FailAfter {
        fragments: Vec<String>,
        error: MockError,
    },
    /// Refuse to open the stream.
    Reject(MockError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockError {
    /// Simulate a non-success status.
    Http { status: u16, body: String },
    /// Simulate authentication failure.
    AuthenticationFailed,
    /// Simulate network error.
    Network { message: String },
    /// Simulate an error event inside the stream.
    Provider { message: String },
}

impl From<MockError> for AIError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::Http { status, body } => AIError::http(status, body),
            MockError::AuthenticationFailed => AIError::AuthenticationFailed,
            MockError::Network { message } => AIError::network(message),
            MockError::Provider { message } => AIError::Provider(message),
        }
    }
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn owned(fragments: &[&str]) -> Vec<String> {
    fragments.iter().map(|f| f.to_string()).collect()
}

impl MockAIProvider {
    /// Creates a new mock provider with default settings.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            info: ProviderInfo::new("mock", "mock-model-1", "mock://chat"),
            delay: Duration::ZERO,
            probe: Ok("Connected to mock provider".to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn push(self, response: MockResponse) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Queues a reply streamed as the given fragments.
    pub fn with_reply(self, fragments: &[&str]) -> Self {
        self.push(MockResponse::Fragments(owned(fragments)))
    }

    /// Queues a reply that fails after streaming the given fragments.
    pub fn with_failure_after(self, fragments: &[&str], error: MockError) -> Self {
        self.push(MockResponse::FailAfter {
            fragments: owned(fragments),
            error,
        })
    }

    /// Queues a refusal to open the stream.
    pub fn with_error(self, error: MockError) -> Self {
        self.push(MockResponse::Reject(error))
    }

    /// Sets simulated latency before each fragment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the probe result.
    pub fn with_probe(mut self, probe: Result<String, AIError>) -> Self {
        self.probe = probe;
        self
    }

    /// Sets the provider info.
    pub fn with_provider_info(mut self, info: ProviderInfo) -> Self {
        self.info = info;
        self
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<ChatRequest> {
        lock(&self.calls).clone()
    }

    /// Returns the most recent call.
    pub fn last_call(&self) -> Option<ChatRequest> {
        lock(&self.calls).last().cloned()
    }

    /// Clears the call history.
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Factory that hands out this provider for any configuration.
    pub fn factory(&self) -> MockProviderFactory {
        MockProviderFactory {
            provider: self.clone(),
            configs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Gets the next response or a default.
    fn next_response(&self) -> MockResponse {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Fragments(vec!["Mock response".to_string()]))
    }

    fn delayed(&self, items: Vec<Result<String, AIError>>) -> TextStream {
        let delay = self.delay;
        Box::pin(stream::iter(items).then(move |item| async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            item
        }))
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn open_stream(&self, request: ChatRequest) -> Result<TextStream, AIError> {
        lock(&self.calls).push(request);

        match self.next_response() {
            MockResponse::Fragments(fragments) => {
                Ok(self.delayed(fragments.into_iter().map(Ok).collect()))
            }
            MockResponse::FailAfter { fragments, error } => {
                let mut items: Vec<Result<String, AIError>> =
                    fragments.into_iter().map(Ok).collect();
                items.push(Err(error.into()));
                Ok(self.delayed(items))
            }
            MockResponse::Reject(error) => Err(error.into()),
        }
    }

    async fn probe(&self) -> Result<String, AIError> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.probe.clone()
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}

/// Hands out a shared [`MockAIProvider`] and records every configuration it
/// was asked to build for.
#[derive(Debug, Clone)]
pub struct MockProviderFactory {
    provider: MockAIProvider,
    configs: Arc<Mutex<Vec<AIProviderConfig>>>,
}

impl MockProviderFactory {
    pub fn provider(&self) -> &MockAIProvider {
        &self.provider
    }

    /// Configurations passed to `build`, oldest first.
    pub fn built_for(&self) -> Vec<AIProviderConfig> {
        lock(&self.configs).clone()
    }
}

impl ProviderFactory for MockProviderFactory {
    fn build(&self, config: &AIProviderConfig) -> Result<Arc<dyn AIProvider>, AIError> {
        lock(&self.configs).push(config.clone());
        Ok(Arc::new(self.provider.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Message;

    fn request() -> ChatRequest {
        ChatRequest::new(vec![Message::user("hi")])
    }

    async fn drain(stream: TextStream) -> Vec<Result<String, AIError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn returns_configured_fragments_in_order() {
        let provider = MockAIProvider::new()
            .with_reply(&["Hello", " world"])
            .with_reply(&["Second"]);

        let first = drain(provider.open_stream(request()).await.unwrap()).await;
        let second = drain(provider.open_stream(request()).await.unwrap()).await;

        assert_eq!(first, vec![Ok("Hello".to_string()), Ok(" world".to_string())]);
        assert_eq!(second, vec![Ok("Second".to_string())]);
    }

    #[tokio::test]
    async fn returns_default_when_queue_empty() {
        let provider = MockAIProvider::new();
        let items = drain(provider.open_stream(request()).await.unwrap()).await;
        assert_eq!(items, vec![Ok("Mock response".to_string())]);
    }

    #[tokio::test]
    async fn fails_after_partial_output() {
        let provider = MockAIProvider::new().with_failure_after(
            &["partial"],
            MockError::Network {
                message: "reset".to_string(),
            },
        );

        let items = drain(provider.open_stream(request()).await.unwrap()).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok("partial".to_string()));
        assert!(matches!(items[1], Err(AIError::Network(_))));
    }

    #[tokio::test]
    async fn rejects_request() {
        let provider = MockAIProvider::new().with_error(MockError::AuthenticationFailed);
        let result = provider.open_stream(request()).await;
        assert!(matches!(result, Err(AIError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn tracks_calls() {
        let provider = MockAIProvider::new();
        assert_eq!(provider.call_count(), 0);

        provider.open_stream(request()).await.unwrap();
        provider.open_stream(request()).await.unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.last_call(), Some(request()));

        provider.clear_calls();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn factory_shares_queue_and_records_configs() {
        let provider = MockAIProvider::new().with_reply(&["from factory"]);
        let factory = provider.factory();

        let built = factory.build(&AIProviderConfig::default()).unwrap();
        let items = drain(built.open_stream(request()).await.unwrap()).await;

        assert_eq!(items, vec![Ok("from factory".to_string())]);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(factory.built_for().len(), 1);
        assert_eq!(factory.built_for()[0].provider_id(), "ollama");
    }

    #[tokio::test]
    async fn probe_returns_configured_result() {
        let provider =
            MockAIProvider::new().with_probe(Err(AIError::network("Connection refused")));
        assert!(provider.probe().await.is_err());
    }
}
