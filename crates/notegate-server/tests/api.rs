use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use notegate_core::client::FrameDecoder;
use notegate_core::config::{AiSettings, MemorySettingsProvider};
use notegate_core::logging::NoOpLogger;
use notegate_core::retrieval::{ContextPage, StaticRetriever};
use notegate_core::types::{ProviderKind, SourceRef, StreamFrame};
use notegate_server::{create_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NDJSON_BODY: &str = concat!(
    "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n",
    "{\"message\":{\"role\":\"assistant\",\"content\":\"lo, \"},\"done\":false}\n",
    "{\"message\":{\"role\":\"assistant\",\"content\":\"world\"},\"done\":false}\n",
    "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"done_reason\":\"stop\"}\n",
);

fn state(settings: AiSettings) -> AppState {
    AppState::new(
        Arc::new(MemorySettingsProvider::new(settings)),
        Arc::new(NoOpLogger),
    )
}

fn app(settings: AiSettings) -> Router {
    create_router(state(settings))
}

fn local_override(server: &MockServer) -> Value {
    json!({"provider": "local", "baseUrl": server.uri()})
}

async fn post(app: Router, uri: &str, body: Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn frames(response: Response) -> Vec<StreamFrame> {
    FrameDecoder::new().push(&body_bytes(response).await)
}

async fn mount_ndjson(server: &MockServer, body: &'static str) {
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn health_and_providers() {
    let response = get(app(AiSettings::default()), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");

    let response = get(app(AiSettings::default()), "/api/ai/providers").await;
    assert_eq!(response.status(), StatusCode::OK);
    let providers = json_body(response).await;
    let ids: Vec<&str> = providers
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["openai", "anthropic", "local"]);
    assert_eq!(providers[2]["requiresCredential"], false);
}

#[tokio::test]
async fn chat_streams_sources_content_done() {
    let upstream = MockServer::start().await;
    mount_ndjson(&upstream, NDJSON_BODY).await;

    let retriever = StaticRetriever::new(vec![
        ContextPage::new("p1", "Intro", "Greetings and salutations for every visitor."),
        ContextPage::new("p2", "Recipes", "Pasta sauce."),
    ]);
    let app = create_router(state(AiSettings::default()).with_retriever(Arc::new(retriever)));

    let response = post(
        app,
        "/api/ai/chat",
        json!({
            "messages": [{"role": "user", "content": "Say greetings"}],
            "provider": local_override(&upstream)
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    assert_eq!(response.headers()["cache-control"].to_str().unwrap(), "no-cache");

    assert_eq!(
        frames(response).await,
        vec![
            StreamFrame::sources(vec![SourceRef::new("p1", "Intro")]),
            StreamFrame::content("Hel"),
            StreamFrame::content("lo, "),
            StreamFrame::content("world"),
            StreamFrame::Done,
        ]
    );

    let requests = upstream.received_requests().await.unwrap();
    let sent: Value = requests[0].body_json().unwrap();
    assert_eq!(sent["stream"], true);
    assert_eq!(sent["messages"][0]["role"], "system");
    assert!(sent["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("## Intro"));
    assert_eq!(sent["messages"][1]["content"], "Say greetings");
}

#[tokio::test]
async fn chat_without_retriever_has_no_sources_frame() {
    let upstream = MockServer::start().await;
    mount_ndjson(&upstream, NDJSON_BODY).await;

    let response = post(
        app(AiSettings::default()),
        "/api/ai/chat",
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "provider": local_override(&upstream)
        }),
    )
    .await;
    let frames = frames(response).await;
    assert_eq!(frames.first(), Some(&StreamFrame::content("Hel")));
    assert_eq!(frames.last(), Some(&StreamFrame::Done));
}

#[tokio::test]
async fn chat_upstream_failure_mid_stream_is_error_frame() {
    let upstream = MockServer::start().await;
    mount_ndjson(
        &upstream,
        concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"partial\"},\"done\":false}\n",
            "{\"error\":\"model runner has unexpectedly stopped\"}\n",
        ),
    )
    .await;

    let response = post(
        app(AiSettings::default()),
        "/api/ai/chat",
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "provider": local_override(&upstream)
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let frames = frames(response).await;
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], StreamFrame::content("partial"));
    match &frames[1] {
        StreamFrame::Error { error } => assert!(error.contains("unexpectedly stopped")),
        other => panic!("expected error frame, got {other:?}"),
    }
}

#[tokio::test]
async fn chat_upstream_rejection_is_bad_gateway() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("out of memory"))
        .mount(&upstream)
        .await;

    let response = post(
        app(AiSettings::default()),
        "/api/ai/chat",
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "provider": local_override(&upstream)
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        json_body(response).await["error"],
        "local API error (500): out of memory"
    );
}

#[tokio::test]
async fn chat_configuration_errors() {
    let response = post(
        app(AiSettings::default()),
        "/api/ai/chat",
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "provider": {"provider": "openai"}
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "API key is required for openai");

    let response = post(
        app(AiSettings::default()),
        "/api/ai/chat",
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "provider": {"provider": "mystery"}
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = json_body(response).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("Unknown provider: mystery"), "{error}");

    let response = post(
        app(AiSettings::default()),
        "/api/ai/chat",
        json!({"messages": []}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settings_select_backend_and_model() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "mistral", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "from settings"},
            "done": true
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let settings = AiSettings::new(ProviderKind::Local)
        .with_model("mistral")
        .with_base_url(upstream.uri());
    let response = post(
        app(settings),
        "/api/ai/complete",
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["content"], "from settings");
}

#[tokio::test]
async fn caller_model_beats_settings_model() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "phi3"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "ok"},
            "done": true
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let settings = AiSettings::new(ProviderKind::Local)
        .with_model("mistral")
        .with_base_url(upstream.uri());
    let response = post(
        app(settings),
        "/api/ai/complete",
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "options": {"model": "phi3"}
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn embed_local() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .and(body_partial_json(json!({"prompt": "a note"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.5, 0.25, 1.0]})))
        .mount(&upstream)
        .await;

    let response = post(
        app(AiSettings::default()),
        "/api/ai/embed",
        json!({"text": "a note", "provider": local_override(&upstream)}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"embedding": [0.5, 0.25, 1.0], "dimensions": 3})
    );
}

#[tokio::test]
async fn embed_anthropic_without_embedding_credential() {
    let response = post(
        app(AiSettings::default()),
        "/api/ai/embed",
        json!({
            "text": "a note",
            "provider": {"provider": "anthropic", "apiKey": "sk-ant"}
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await["error"],
        "embeddings require an OpenAI-compatible credential"
    );

    let response = post(
        app(AiSettings::default()),
        "/api/ai/embed",
        json!({"text": "  "}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stream_budget_ends_slow_stream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(NDJSON_BODY, "application/x-ndjson")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&upstream)
        .await;

    let app = create_router(
        state(AiSettings::default()).with_stream_timeout(Duration::from_secs(1)),
    );
    let response = post(
        app,
        "/api/ai/chat",
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "provider": local_override(&upstream)
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        json_body(response).await["error"],
        "Stream timed out after 1 seconds"
    );
}

#[tokio::test]
async fn chat_body_is_data_lines_only() {
    let upstream = MockServer::start().await;
    mount_ndjson(&upstream, NDJSON_BODY).await;

    let response = post(
        app(AiSettings::default()),
        "/api/ai/chat",
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "provider": local_override(&upstream)
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(!body.lines().any(|line| line.starts_with(':')));
    let expected: String = [
        StreamFrame::content("Hel"),
        StreamFrame::content("lo, "),
        StreamFrame::content("world"),
        StreamFrame::Done,
    ]
    .iter()
    .map(StreamFrame::encode)
    .collect();
    assert_eq!(body, expected);
}
