//! Integration tests for the AI gateway against local HTTP backends.
//!
//! Each test starts an axum server on a loopback port that speaks one
//! backend's streaming envelope, points the gateway at it through the real
//! `HttpProviderFactory`, and checks the fragments that come out:
//! 1. Text deltas are extracted in order, envelopes discarded
//! 2. Malformed lines are skipped without ending the stream
//! 3. Terminal markers end the stream normally
//! 4. Status, network and time-budget failures end with one failure fragment

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{json, Value};

use inclusive_design_wizard::adapters::HttpProviderFactory;
use inclusive_design_wizard::application::{AiGateway, GatewaySettings};
use inclusive_design_wizard::domain::ai::{
    AIProviderConfig, Fragment, ProviderSelection, StreamFailure, StreamFailureKind,
};
use inclusive_design_wizard::ports::Message;

// =============================================================================
// Test Infrastructure
// =============================================================================

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Address nothing listens on.
async fn closed_port() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn gateway(selection: ProviderSelection, stream_timeout: Duration) -> AiGateway {
    let config = AIProviderConfig::resolve(selection).unwrap();
    AiGateway::new(
        config,
        Arc::new(HttpProviderFactory::new().unwrap()),
        GatewaySettings {
            stream_timeout,
            probe_timeout: Duration::from_secs(2),
        },
    )
}

/// Concatenated text plus the failure, if the stream ended with one.
async fn complete(gateway: &AiGateway) -> (String, Option<StreamFailure>) {
    let fragments: Vec<Fragment> = gateway
        .stream_completion(vec![Message::user("Who are my learners?")], "BASE", None)
        .await
        .collect()
        .await;

    let mut text = String::new();
    let mut failure = None;
    for (index, fragment) in fragments.iter().enumerate() {
        match fragment {
            Fragment::Text(delta) => text.push_str(delta),
            Fragment::Failed(f) => {
                assert_eq!(index, fragments.len() - 1, "failure must be the last fragment");
                failure = Some(f.clone());
            }
        }
    }
    (text, failure)
}

fn body(lines: &[&str]) -> String {
    lines.concat()
}

// =============================================================================
// Ollama (NDJSON)
// =============================================================================

#[tokio::test]
async fn ollama_stream_yields_text_until_done() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            body(&[
                "{\"message\":{\"role\":\"assistant\",\"content\":\"Hello\"},\"done\":false}\n",
                "this is not json\n",
                "{\"message\":{\"role\":\"assistant\",\"content\":\", world\"},\"done\":false}\n",
                "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
                "{\"message\":{\"role\":\"assistant\",\"content\":\"after done\"},\"done\":false}\n",
            ])
        }),
    );
    let base = serve(app).await;
    let gateway = gateway(
        ProviderSelection::new("ollama").with_base_url(base),
        Duration::from_secs(5),
    );

    let (text, failure) = complete(&gateway).await;

    assert_eq!(text, "Hello, world");
    assert!(failure.is_none());
}

#[tokio::test]
async fn ollama_request_carries_framed_system_prompt_and_history() {
    let app = Router::new().route(
        "/api/chat",
        post(|Json(request): Json<Value>| async move {
            let messages = request["messages"].as_array().cloned().unwrap_or_default();
            let ok = request["stream"] == json!(true)
                && messages.len() == 2
                && messages[0]["role"] == "system"
                && messages[0]["content"] == "BASE"
                && messages[1]["role"] == "user";
            let reply = if ok { "ok" } else { "bad request shape" };
            format!(
                "{{\"message\":{{\"content\":\"{}\"}},\"done\":false}}\n{{\"done\":true}}\n",
                reply
            )
        }),
    );
    let base = serve(app).await;
    let gateway = gateway(
        ProviderSelection::new("ollama").with_base_url(base),
        Duration::from_secs(5),
    );

    let (text, _) = complete(&gateway).await;

    assert_eq!(text, "ok");
}

#[tokio::test]
async fn ollama_probe_lists_models() {
    let app = Router::new().route(
        "/api/tags",
        get(|| async {
            Json(json!({"models": [{"name": "llama3.2"}, {"name": "gemma3:4b"}]}))
        }),
    );
    let base = serve(app).await;
    let gateway = gateway(
        ProviderSelection::new("ollama").with_base_url(base),
        Duration::from_secs(5),
    );

    let (ok, message) = gateway.test_connection().await;

    assert!(ok);
    assert_eq!(message, "Connected. Available models: llama3.2, gemma3:4b");
}

#[tokio::test]
async fn local_probe_requires_200_ok() {
    let app = Router::new().route("/models", get(|| async { StatusCode::NO_CONTENT }));
    let base = serve(app).await;
    let gateway = gateway(
        ProviderSelection::new("lmstudio").with_base_url(base),
        Duration::from_secs(5),
    );

    let (ok, message) = gateway.test_connection().await;

    assert!(!ok);
    assert!(message.starts_with("server returned status 204"));
}

#[tokio::test]
async fn ollama_error_line_ends_stream_with_failure() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            body(&[
                "{\"message\":{\"content\":\"Partial\"},\"done\":false}\n",
                "{\"error\":\"model 'llama9' not found\"}\n",
            ])
        }),
    );
    let base = serve(app).await;
    let gateway = gateway(
        ProviderSelection::new("ollama").with_base_url(base),
        Duration::from_secs(5),
    );

    let (text, failure) = complete(&gateway).await;

    assert_eq!(text, "Partial");
    let failure = failure.expect("stream should fail");
    assert_eq!(failure.kind, StreamFailureKind::Provider);
    assert!(failure.message.contains("llama9"));
}

// =============================================================================
// OpenAI-compatible (SSE)
// =============================================================================

#[tokio::test]
async fn local_openai_compatible_stream_stops_at_done_sentinel() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async {
            body(&[
                "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
                ": keep-alive\n\n",
                "data: {broken\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n",
                "data: [DONE]\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"!!\"}}]}\n\n",
            ])
        }),
    );
    let base = serve(app).await;
    let gateway = gateway(
        ProviderSelection::new("lmstudio").with_base_url(base),
        Duration::from_secs(5),
    );

    let (text, failure) = complete(&gateway).await;

    assert_eq!(text, "Hi there");
    assert!(failure.is_none());
}

#[tokio::test]
async fn cloud_openai_sends_bearer_key() {
    let app = Router::new().route(
        "/chat/completions",
        post(|headers: HeaderMap| async move {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer sk-test");
            if !authorized {
                return (StatusCode::UNAUTHORIZED, "missing key".to_string()).into_response();
            }
            body(&[
                "data: {\"choices\":[{\"delta\":{\"content\":\"Authorized\"}}]}\n\n",
                "data: [DONE]\n\n",
            ])
            .into_response()
        }),
    );
    let base = serve(app).await;

    let with_key = gateway(
        ProviderSelection::new("openai")
            .with_api_key("sk-test")
            .with_base_url(base.clone()),
        Duration::from_secs(5),
    );
    let (text, failure) = complete(&with_key).await;
    assert_eq!(text, "Authorized");
    assert!(failure.is_none());

    let wrong_key = gateway(
        ProviderSelection::new("openai")
            .with_api_key("sk-wrong")
            .with_base_url(base),
        Duration::from_secs(5),
    );
    let (text, failure) = complete(&wrong_key).await;
    assert!(text.is_empty());
    assert_eq!(failure.unwrap().kind, StreamFailureKind::Http);
}

#[tokio::test]
async fn server_error_status_becomes_failure_fragment() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
    );
    let base = serve(app).await;
    let gateway = gateway(
        ProviderSelection::new("gpt4all").with_base_url(base),
        Duration::from_secs(5),
    );

    let (text, failure) = complete(&gateway).await;

    assert!(text.is_empty());
    let failure = failure.expect("stream should fail");
    assert_eq!(failure.kind, StreamFailureKind::Http);
    assert!(failure.to_string().contains("500"));
}

// =============================================================================
// Anthropic (typed SSE)
// =============================================================================

#[tokio::test]
async fn anthropic_stream_uses_system_field_and_text_deltas() {
    let app = Router::new().route(
        "/v1/messages",
        post(|headers: HeaderMap, Json(request): Json<Value>| async move {
            let key_ok = headers.get("x-api-key").and_then(|v| v.to_str().ok())
                == Some("sk-ant-test");
            let version_ok = headers.get("anthropic-version").is_some();
            let messages = request["messages"].as_array().cloned().unwrap_or_default();
            let shape_ok = request["system"] == "BASE"
                && messages.iter().all(|m| m["role"] != "system");
            if !(key_ok && version_ok && shape_ok) {
                return (StatusCode::BAD_REQUEST, "unexpected request").into_response();
            }
            body(&[
                "event: message_start\n",
                "data: {\"type\":\"message_start\"}\n\n",
                "event: content_block_delta\n",
                "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Bonjour\"}}\n\n",
                "event: ping\n",
                "data: {\"type\":\"ping\"}\n\n",
                "event: content_block_delta\n",
                "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" tout le monde\"}}\n\n",
                "event: message_stop\n",
                "data: {\"type\":\"message_stop\"}\n\n",
            ])
            .into_response()
        }),
    );
    let base = serve(app).await;
    let gateway = gateway(
        ProviderSelection::new("anthropic")
            .with_api_key("sk-ant-test")
            .with_base_url(base),
        Duration::from_secs(5),
    );

    let (text, failure) = complete(&gateway).await;

    assert!(failure.is_none(), "unexpected failure: {:?}", failure);
    assert_eq!(text, "Bonjour tout le monde");
}

#[tokio::test]
async fn anthropic_probe_validates_key_shape() {
    let good = gateway(
        ProviderSelection::new("anthropic").with_api_key("sk-ant-abc"),
        Duration::from_secs(5),
    );
    assert_eq!(
        good.test_connection().await,
        (true, "API key format valid for Anthropic".to_string())
    );

    let bad = gateway(
        ProviderSelection::new("anthropic").with_api_key("not-a-key"),
        Duration::from_secs(5),
    );
    let (ok, message) = bad.test_connection().await;
    assert!(!ok);
    assert!(message.contains("Invalid Anthropic API key format"));
}

// =============================================================================
// Failures outside the payload
// =============================================================================

#[tokio::test]
async fn slow_stream_is_cut_off_by_time_budget() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            let lines = futures::stream::unfold(0u32, |n| async move {
                if n >= 20 {
                    return None;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
                let line = format!("{{\"message\":{{\"content\":\"{} \"}},\"done\":false}}\n", n);
                Some((Ok::<_, Infallible>(line), n + 1))
            });
            Response::new(Body::from_stream(lines))
        }),
    );
    let base = serve(app).await;
    let gateway = gateway(
        ProviderSelection::new("ollama").with_base_url(base),
        Duration::from_millis(450),
    );

    let started = tokio::time::Instant::now();
    let (text, failure) = complete(&gateway).await;

    assert_eq!(failure.expect("stream should time out").kind, StreamFailureKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!text.contains("19 "));
}

#[tokio::test]
async fn unreachable_backend_is_a_network_failure() {
    let base = closed_port().await;
    let gateway = gateway(
        ProviderSelection::new("ollama").with_base_url(base),
        Duration::from_secs(5),
    );

    let (text, failure) = complete(&gateway).await;
    assert!(text.is_empty());
    assert_eq!(failure.unwrap().kind, StreamFailureKind::Network);

    let (ok, message) = gateway.test_connection().await;
    assert!(!ok);
    assert!(message.starts_with("network error"));
}

#[tokio::test]
async fn listed_but_unwired_provider_is_a_configuration_failure() {
    let gateway = gateway(
        ProviderSelection::new("google").with_api_key("AIza-test"),
        Duration::from_secs(5),
    );

    let (_, failure) = complete(&gateway).await;
    assert_eq!(failure.unwrap().kind, StreamFailureKind::Configuration);

    let (ok, message) = gateway.test_connection().await;
    assert!(!ok);
    assert!(message.contains("not implemented"));
}
