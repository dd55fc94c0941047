//! AI Gateway - one streaming contract over every configured backend.
//!
//! The gateway owns the active [`AIProviderConfig`] and a mirror of the
//! conversation history. It frames the system prompt with the current phase,
//! asks the [`ProviderFactory`] for a backend and turns the provider's text
//! deltas into [`Fragment`]s under a single wall-clock budget.
//!
//! Failures never surface as `Err` once a stream has been requested: they
//! arrive as a final [`Fragment::Failed`], after any text already produced.

use futures::{stream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::AiConfig;
use crate::domain::ai::{
    AIError, AIProviderConfig, Fragment, PhaseContext, ProviderSelection, StreamFailure,
};
use crate::domain::consultation::TurnRole;
use crate::ports::{ChatRequest, Message, ProviderFactory, ProviderInfo, TextStream};

/// Lazily produced reply fragments; finite and not restartable.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Fragment> + Send>>;

/// Time budgets applied by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewaySettings {
    /// Upper bound on one streamed reply, from request to last fragment.
    pub stream_timeout: Duration,
    /// Upper bound on a connection probe.
    pub probe_timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            stream_timeout: Duration::from_secs(120),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&AiConfig> for GatewaySettings {
    fn from(config: &AiConfig) -> Self {
        Self {
            stream_timeout: config.stream_timeout(),
            probe_timeout: config.probe_timeout(),
        }
    }
}

/// Gateway between the consultation engine and the active AI backend.
pub struct AiGateway {
    config: RwLock<AIProviderConfig>,
    history: RwLock<Vec<Message>>,
    factory: Arc<dyn ProviderFactory>,
    settings: GatewaySettings,
}

impl AiGateway {
    /// Creates a gateway for an already resolved configuration.
    ///
    /// A cloud provider without a credential is accepted here so the
    /// application can start; generation and probing report it.
    pub fn new(
        config: AIProviderConfig,
        factory: Arc<dyn ProviderFactory>,
        settings: GatewaySettings,
    ) -> Self {
        if config.require_credential().is_err() {
            warn!(
                provider = %config.provider_id(),
                "Cloud provider configured without an API key"
            );
        }
        Self {
            config: RwLock::new(config),
            history: RwLock::new(Vec::new()),
            factory,
            settings,
        }
    }

    /// Builds a gateway from the application's AI configuration.
    pub fn from_config(
        config: &AiConfig,
        factory: Arc<dyn ProviderFactory>,
    ) -> Result<Self, AIError> {
        let resolved = AIProviderConfig::resolve(config.to_selection())?;
        Ok(Self::new(resolved, factory, GatewaySettings::from(config)))
    }

    pub fn settings(&self) -> GatewaySettings {
        self.settings
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────

    /// Replaces the active configuration wholesale.
    ///
    /// Blank fields of the selection are filled from the provider registry;
    /// nothing is carried over from the previous configuration.
    ///
    /// # Errors
    ///
    /// - `UnknownProvider` if the provider id is not registered
    /// - `InvalidConfiguration` if the requested mode does not match
    /// - `CredentialRequired` for a cloud provider without an API key
    pub async fn configure(&self, selection: ProviderSelection) -> Result<(), AIError> {
        let resolved = AIProviderConfig::resolve(selection)?;
        resolved.require_credential()?;

        info!(
            provider = %resolved.provider_id(),
            model = %resolved.model_id(),
            mode = %resolved.mode(),
            "AI provider configured"
        );
        *self.config.write().await = resolved;
        Ok(())
    }

    /// Snapshot of the active configuration.
    pub async fn config(&self) -> AIProviderConfig {
        self.config.read().await.clone()
    }

    /// Known models of the active provider.
    pub async fn available_models(&self) -> &'static [&'static str] {
        self.config.read().await.available_models()
    }

    /// Name, model and endpoint of the backend requests currently go to.
    pub async fn active_backend(&self) -> Result<ProviderInfo, AIError> {
        let config = self.config().await;
        let provider = self.factory.build(&config)?;
        Ok(provider.provider_info())
    }

    /// Checks that the active backend is reachable (or, for cloud
    /// providers, that a plausible credential is configured).
    ///
    /// A missing cloud credential always yields the "API key is required"
    /// message, never a network error.
    pub async fn test_connection(&self) -> (bool, String) {
        let config = self.config().await;

        if let Err(err) = config.require_credential() {
            return (false, err.to_string());
        }

        let provider = match self.factory.build(&config) {
            Ok(provider) => provider,
            Err(err) => return (false, err.to_string()),
        };

        match timeout(self.settings.probe_timeout, provider.probe()).await {
            Ok(Ok(message)) => {
                info!(provider = %config.provider_id(), "Connection test succeeded");
                (true, message)
            }
            Ok(Err(err)) => {
                warn!(provider = %config.provider_id(), error = %err, "Connection test failed");
                (false, err.to_string())
            }
            Err(_) => {
                let err = AIError::Timeout {
                    timeout_secs: self.settings.probe_timeout.as_secs(),
                };
                warn!(provider = %config.provider_id(), "Connection test timed out");
                (false, err.to_string())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conversation history mirror
    // ─────────────────────────────────────────────────────────────────────────

    /// Clears the history mirror between sessions.
    pub async fn reset_conversation(&self) {
        self.history.write().await.clear();
    }

    pub async fn add_to_history(&self, role: TurnRole, content: impl Into<String>) {
        self.history
            .write()
            .await
            .push(Message::new(role.into(), content));
    }

    pub async fn history(&self) -> Vec<Message> {
        self.history.read().await.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Streaming
    // ─────────────────────────────────────────────────────────────────────────

    /// Streams a reply to the mirrored history.
    pub async fn stream_reply(
        &self,
        system_prompt: &str,
        context: Option<&PhaseContext>,
    ) -> FragmentStream {
        let history = self.history().await;
        self.stream_completion(history, system_prompt, context).await
    }

    /// Streams a completion for `history` framed by `system_prompt` and the
    /// optional phase context.
    ///
    /// The whole exchange (building the backend, opening the request and
    /// every subsequent fragment) shares one deadline. The stream ends
    /// normally on the provider's terminal marker, or with exactly one
    /// `Fragment::Failed` on configuration, HTTP, network or timeout
    /// failures.
    pub async fn stream_completion(
        &self,
        history: Vec<Message>,
        system_prompt: &str,
        context: Option<&PhaseContext>,
    ) -> FragmentStream {
        let deadline = Instant::now() + self.settings.stream_timeout;
        let timeout_secs = self.settings.stream_timeout.as_secs();
        let config = self.config().await;
        let request = build_request(history, system_prompt, context);

        let opened = async {
            config.require_credential()?;
            let provider = self.factory.build(&config)?;
            let backend = provider.provider_info();
            info!(
                provider = %backend.name,
                model = %backend.model,
                endpoint = %backend.endpoint,
                messages = request.messages.len(),
                "Opening completion stream"
            );
            provider.open_stream(request).await
        };

        let inner = match timeout_at(deadline, opened).await {
            Ok(Ok(inner)) => inner,
            Ok(Err(err)) => {
                warn!(provider = %config.provider_id(), error = %err, "Completion request failed");
                return failed(err.into());
            }
            Err(_) => {
                warn!(provider = %config.provider_id(), timeout_secs, "Completion request timed out");
                return failed(StreamFailure::timeout(timeout_secs));
            }
        };

        relay(inner, deadline, timeout_secs)
    }
}

/// System message (base prompt plus phase annotations) followed by the
/// history in order.
fn build_request(
    history: Vec<Message>,
    system_prompt: &str,
    context: Option<&PhaseContext>,
) -> ChatRequest {
    let system = match context {
        Some(context) => context.frame(system_prompt),
        None => system_prompt.to_string(),
    };

    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Message::system(system));
    messages.extend(history);
    ChatRequest::new(messages)
}

fn failed(failure: StreamFailure) -> FragmentStream {
    Box::pin(stream::once(async move { Fragment::Failed(failure) }))
}

/// Forwards provider deltas until the provider ends, fails, or the deadline
/// passes. Nothing is read after the first failure.
fn relay(inner: TextStream, deadline: Instant, timeout_secs: u64) -> FragmentStream {
    Box::pin(stream::unfold(Some(inner), move |state| async move {
        let mut inner = state?;
        match timeout_at(deadline, inner.next()).await {
            Ok(Some(Ok(text))) => Some((Fragment::Text(text), Some(inner))),
            Ok(Some(Err(err))) => {
                warn!(error = %err, "Completion stream failed");
                Some((Fragment::Failed(err.into()), None))
            }
            Ok(None) => {
                debug!("Completion stream finished");
                None
            }
            Err(_) => {
                warn!(timeout_secs, "Completion stream exceeded its time budget");
                Some((Fragment::Failed(StreamFailure::timeout(timeout_secs)), None))
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError, MockProviderFactory};
    use crate::domain::ai::{ProviderMode, StreamFailureKind};
    use crate::ports::MessageRole;

    fn gateway_with(provider: MockAIProvider) -> (AiGateway, MockProviderFactory) {
        gateway_with_settings(provider, GatewaySettings::default())
    }

    fn gateway_with_settings(
        provider: MockAIProvider,
        settings: GatewaySettings,
    ) -> (AiGateway, MockProviderFactory) {
        let factory = provider.factory();
        let config = AIProviderConfig::resolve(ProviderSelection::new("ollama")).unwrap();
        let gateway = AiGateway::new(config, Arc::new(factory.clone()), settings);
        (gateway, factory)
    }

    fn context() -> PhaseContext {
        PhaseContext {
            phase_name: "Learner Analysis".to_string(),
            framework: "UDL".to_string(),
            rationale: "Learner variability is the norm".to_string(),
            next_question: None,
        }
    }

    async fn collect(stream: FragmentStream) -> Vec<Fragment> {
        stream.collect().await
    }

    #[tokio::test]
    async fn streams_fragments_in_order() {
        let (gateway, _) = gateway_with(MockAIProvider::new().with_reply(&["Hello", ", ", "world"]));

        let fragments = collect(
            gateway
                .stream_completion(vec![Message::user("hi")], "BASE", None)
                .await,
        )
        .await;

        let text: String = fragments.iter().filter_map(Fragment::text).collect();
        assert_eq!(text, "Hello, world");
        assert_eq!(fragments.len(), 3);
    }

    #[tokio::test]
    async fn active_backend_reports_built_provider() {
        let info = ProviderInfo::new("ollama", "gemma3:4b", "http://localhost:11434/api/chat");
        let (gateway, factory) =
            gateway_with(MockAIProvider::new().with_provider_info(info.clone()));

        assert_eq!(gateway.active_backend().await.unwrap(), info);
        assert_eq!(factory.built_for().len(), 1);
    }

    #[tokio::test]
    async fn request_starts_with_framed_system_message() {
        let (gateway, factory) = gateway_with(MockAIProvider::new());
        let history = vec![Message::user("one"), Message::assistant("two")];

        collect(gateway.stream_completion(history, "BASE", Some(&context())).await).await;

        let request = factory.provider().last_call().unwrap();
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.messages[0].content, context().frame("BASE"));
        assert_eq!(request.messages[1], Message::user("one"));
        assert_eq!(request.messages[2], Message::assistant("two"));
    }

    #[tokio::test]
    async fn failure_after_partial_output_ends_with_failed_fragment() {
        let (gateway, _) = gateway_with(MockAIProvider::new().with_failure_after(
            &["Partial"],
            MockError::Network {
                message: "connection reset".to_string(),
            },
        ));

        let fragments = collect(gateway.stream_completion(vec![], "BASE", None).await).await;

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0], Fragment::Text("Partial".to_string()));
        match &fragments[1] {
            Fragment::Failed(failure) => assert_eq!(failure.kind, StreamFailureKind::Network),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejected_request_yields_single_failure() {
        let (gateway, _) = gateway_with(MockAIProvider::new().with_error(MockError::Http {
            status: 500,
            body: "boom".to_string(),
        }));

        let fragments = collect(gateway.stream_completion(vec![], "BASE", None).await).await;

        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].display_text().contains("500"));
    }

    #[tokio::test]
    async fn empty_success_is_distinguishable_from_failure() {
        let (gateway, _) = gateway_with(MockAIProvider::new().with_reply(&[]));

        let fragments = collect(gateway.stream_completion(vec![], "BASE", None).await).await;

        assert!(fragments.is_empty());
    }

    #[tokio::test]
    async fn slow_stream_is_cut_off_by_overall_budget() {
        let settings = GatewaySettings {
            stream_timeout: Duration::from_millis(150),
            probe_timeout: Duration::from_secs(1),
        };
        let (gateway, _) = gateway_with_settings(
            MockAIProvider::new()
                .with_reply(&["a", "b", "c", "d", "e", "f"])
                .with_delay(Duration::from_millis(60)),
            settings,
        );

        let fragments = collect(gateway.stream_completion(vec![], "BASE", None).await).await;

        let last = fragments.last().unwrap();
        match last {
            Fragment::Failed(failure) => assert_eq!(failure.kind, StreamFailureKind::Timeout),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(fragments.len() < 7);
    }

    #[tokio::test]
    async fn configure_replaces_config_wholesale() {
        let (gateway, _) = gateway_with(MockAIProvider::new());

        gateway
            .configure(ProviderSelection::new("lmstudio").with_model("qwen2.5-7b-instruct"))
            .await
            .unwrap();
        gateway
            .configure(ProviderSelection::new("ollama"))
            .await
            .unwrap();

        let config = gateway.config().await;
        assert_eq!(config.provider_id(), "ollama");
        assert_ne!(config.model_id(), "qwen2.5-7b-instruct");
        assert_eq!(config.mode(), ProviderMode::Local);
    }

    #[tokio::test]
    async fn configure_cloud_without_key_fails_fast() {
        let (gateway, _) = gateway_with(MockAIProvider::new());

        let err = gateway
            .configure(ProviderSelection::new("openai"))
            .await
            .unwrap_err();

        assert!(matches!(err, AIError::CredentialRequired { .. }));
        assert_eq!(gateway.config().await.provider_id(), "ollama");
    }

    #[tokio::test]
    async fn configure_unknown_provider_is_rejected() {
        let (gateway, _) = gateway_with(MockAIProvider::new());

        let err = gateway
            .configure(ProviderSelection::new("skynet"))
            .await
            .unwrap_err();

        assert!(matches!(err, AIError::UnknownProvider(_)));
    }

    #[tokio::test]
    async fn missing_credential_fails_connection_test_without_probing() {
        let factory = MockAIProvider::new().factory();
        let config = AIProviderConfig::resolve(ProviderSelection::new("anthropic")).unwrap();
        let gateway = AiGateway::new(config, Arc::new(factory.clone()), GatewaySettings::default());

        let (ok, message) = gateway.test_connection().await;

        assert!(!ok);
        assert!(message.contains("API key is required"));
        assert!(factory.built_for().is_empty());
    }

    #[tokio::test]
    async fn missing_credential_fails_generation_as_configuration_error() {
        let factory = MockAIProvider::new().factory();
        let config = AIProviderConfig::resolve(ProviderSelection::new("openai")).unwrap();
        let gateway = AiGateway::new(config, Arc::new(factory), GatewaySettings::default());

        let fragments = collect(gateway.stream_completion(vec![], "BASE", None).await).await;

        match fragments.as_slice() {
            [Fragment::Failed(failure)] => {
                assert_eq!(failure.kind, StreamFailureKind::Configuration)
            }
            other => panic!("expected configuration failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connection_test_reports_probe_result() {
        let (gateway, _) = gateway_with(
            MockAIProvider::new().with_probe(Ok("Connected. Available models: llama3.2".to_string())),
        );
        assert_eq!(
            gateway.test_connection().await,
            (true, "Connected. Available models: llama3.2".to_string())
        );

        let (gateway, _) =
            gateway_with(MockAIProvider::new().with_probe(Err(AIError::http(404, "missing"))));
        let (ok, message) = gateway.test_connection().await;
        assert!(!ok);
        assert!(message.contains("404"));
    }

    #[tokio::test]
    async fn connection_test_times_out() {
        let settings = GatewaySettings {
            stream_timeout: Duration::from_secs(1),
            probe_timeout: Duration::from_millis(20),
        };
        let (gateway, _) = gateway_with_settings(
            MockAIProvider::new().with_delay(Duration::from_millis(200)),
            settings,
        );

        let (ok, message) = gateway.test_connection().await;

        assert!(!ok);
        assert!(message.contains("timed out"));
    }

    #[tokio::test]
    async fn history_mirror_tracks_and_resets() {
        let (gateway, factory) = gateway_with(MockAIProvider::new());
        gateway.add_to_history(TurnRole::User, "question").await;
        gateway.add_to_history(TurnRole::Assistant, "answer").await;

        collect(gateway.stream_reply("BASE", None).await).await;
        assert_eq!(factory.provider().last_call().unwrap().messages.len(), 3);

        gateway.reset_conversation().await;
        assert!(gateway.history().await.is_empty());
    }

    #[tokio::test]
    async fn lists_registry_models_for_active_provider() {
        let (gateway, _) = gateway_with(MockAIProvider::new());
        assert!(!gateway.available_models().await.is_empty());
    }
}
