use std::sync::Arc;

use notegate_core::client::{ConsumeError, ConsumeStatus, GatewayClient};
use notegate_core::logging::NoOpLogger;
use notegate_core::types::{
    CancellationToken, ChatRequest, EmbedRequest, Message, ProviderConfig, ProviderKind,
    SourceRef, StreamFrame,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GatewayClient {
    match GatewayClient::new(format!("{}/", server.uri()), Arc::new(NoOpLogger)) {
        Ok(client) => client,
        Err(e) => panic!("client should build: {e}"),
    }
}

#[tokio::test]
async fn chat_collects_frames() {
    let server = MockServer::start().await;
    let body = [
        StreamFrame::sources(vec![SourceRef::new("p1", "Intro")]),
        StreamFrame::content("Hello"),
        StreamFrame::content(", world"),
        StreamFrame::Done,
    ]
    .iter()
    .map(StreamFrame::encode)
    .collect::<String>();

    Mock::given(method("POST"))
        .and(path("/api/ai/chat"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "query": "intro"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let request = ChatRequest::new(vec![Message::user("hi")]).with_query("intro");
    let mut frames = Vec::new();
    let outcome = client(&server)
        .chat(&request, &CancellationToken::new(), |frame| frames.push(frame.clone()))
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.text, "Hello, world");
    assert_eq!(outcome.sources, vec![SourceRef::new("p1", "Intro")]);
    assert_eq!(frames.len(), 4);
    assert_eq!(frames.last(), Some(&StreamFrame::Done));
}

#[tokio::test]
async fn chat_error_frame_after_partial_text() {
    let server = MockServer::start().await;
    let body = format!(
        "{}{}",
        StreamFrame::content("Par").encode(),
        StreamFrame::error("openai stream error: connection reset").encode()
    );
    Mock::given(method("POST"))
        .and(path("/api/ai/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let outcome = client(&server)
        .chat(
            &ChatRequest::new(vec![Message::user("hi")]),
            &CancellationToken::new(),
            |_| {},
        )
        .await
        .unwrap();
    assert_eq!(outcome.text, "Par");
    assert_eq!(outcome.error(), Some("openai stream error: connection reset"));
}

#[tokio::test]
async fn chat_refused_before_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai/chat"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": "API key is required for anthropic"})),
        )
        .mount(&server)
        .await;

    let request = ChatRequest::new(vec![Message::user("hi")])
        .with_provider(ProviderConfig::new(ProviderKind::Anthropic));
    let err = client(&server)
        .chat(&request, &CancellationToken::new(), |_| {})
        .await
        .unwrap_err();
    match err {
        ConsumeError::Http { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "API key is required for anthropic");
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn chat_cancelled_before_send() {
    let server = MockServer::start().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = client(&server)
        .chat(&ChatRequest::new(vec![Message::user("hi")]), &cancel, |_| {})
        .await
        .unwrap();
    assert_eq!(outcome.status, ConsumeStatus::Aborted);
    assert!(outcome.text.is_empty());
}

#[tokio::test]
async fn complete_embed_and_providers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai/complete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": "done",
            "finishReason": "stop"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/ai/embed"))
        .and(body_partial_json(json!({"text": "a note"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": [0.5, 0.25],
            "dimensions": 2
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ai/providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "local",
            "displayName": "Local (Ollama)",
            "defaultBaseUrl": "http://localhost:11434",
            "requiresCredential": false,
            "defaultModel": "llama3.2",
            "defaultEmbeddingModel": "nomic-embed-text"
        }])))
        .mount(&server)
        .await;

    let client = client(&server);
    let result = client
        .complete(&ChatRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap();
    assert_eq!(result.content, "done");

    let embedded = client
        .embed(&EmbedRequest::new("a note"))
        .await
        .unwrap();
    assert_eq!(embedded.dimensions, 2);

    let providers = client.providers().await.unwrap();
    assert_eq!(providers[0].id, "local");
}
