//! Streaming chat and blocking completion endpoints

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use notegate_core::providers::{Provider, ProviderError};
use notegate_core::retrieval::{context_message, source_refs, ContextPage};
use notegate_core::stream::{stream_deadline, StreamMultiplexer, SSE_HEADERS};
use notegate_core::types::{last_user_content, ChatRequest, GenerationResult, Message};

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/ai/chat`
///
/// Everything that can fail before the first byte (body, provider selection,
/// credentials, the upstream's initial status) is answered with a JSON error.
/// After that, failures only appear as an in-band `error` frame. The body
/// carries `data:` lines only; no keep-alive comments are interleaved.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body?;
    if req.messages.is_empty() {
        return Err(ApiError::bad_request(
            "Chat request must include at least one message",
        ));
    }

    let resolved = state
        .resolve_chat(req.provider.as_ref(), req.options.unwrap_or_default())
        .await?;

    let query = retrieval_query(req.query.as_deref(), &req.messages);
    let pages = retrieve_context(&state, query.as_deref()).await;
    let mut messages = req.messages;
    if let Some(context) = context_message(&pages) {
        messages.insert(0, context);
    }

    // One budget covers opening the backend stream and draining it.
    let deadline = stream_deadline(resolved.timeout);
    let mut mux = StreamMultiplexer::new(state.logger.clone())
        .with_sources(source_refs(&pages))
        .with_timeout(resolved.timeout);
    if let Some(deadline) = deadline {
        mux = mux.with_deadline(deadline);
    }
    let open = mux.open(&resolved.backend, &messages, &resolved.options);
    let frames = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, open).await {
            Ok(frames) => frames?,
            Err(_) => return Err(ProviderError::Timeout(resolved.timeout.as_secs()).into()),
        },
        None => open.await?,
    };
    tracing::info!(
        provider = %resolved.backend.kind(),
        sources = pages.len(),
        "chat stream opened"
    );

    let events = frames.map(|frame| Ok::<_, Infallible>(Event::default().data(frame.data())));
    let mut response = Sse::new(events).into_response();
    for (name, value) in SSE_HEADERS {
        response.headers_mut().insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    Ok(response)
}

/// `POST /api/ai/complete`
pub async fn complete(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<GenerationResult>, ApiError> {
    let Json(req) = body?;
    if req.messages.is_empty() {
        return Err(ApiError::bad_request(
            "Chat request must include at least one message",
        ));
    }

    let resolved = state
        .resolve_chat(req.provider.as_ref(), req.options.unwrap_or_default())
        .await?;
    let result = resolved.backend.chat(&req.messages, &resolved.options).await?;
    tracing::info!(
        provider = %resolved.backend.kind(),
        chars = result.content.len(),
        "completion finished"
    );
    Ok(Json(result))
}

/// Explicit query if non-blank, else the last user turn
fn retrieval_query(explicit: Option<&str>, messages: &[Message]) -> Option<String> {
    explicit
        .filter(|q| !q.trim().is_empty())
        .or_else(|| last_user_content(messages))
        .map(str::to_string)
}

/// Retrieval failures degrade to an uncontextualized chat.
async fn retrieve_context(state: &AppState, query: Option<&str>) -> Vec<ContextPage> {
    let (Some(retriever), Some(query)) = (state.retriever.as_ref(), query) else {
        return Vec::new();
    };
    match retriever.retrieve(query, state.context_limit).await {
        Ok(pages) => pages,
        Err(e) => {
            tracing::warn!("context retrieval failed: {}", e);
            Vec::new()
        }
    }
}
