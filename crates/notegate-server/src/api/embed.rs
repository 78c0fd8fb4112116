//! Embedding endpoint

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use notegate_core::providers::Provider;
use notegate_core::types::{EmbedRequest, EmbedResponse};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn embed(
    State(state): State<AppState>,
    body: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let Json(req) = body?;
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request("Embedding request must include text"));
    }

    let resolved = state
        .resolve_embedding(req.provider.as_ref(), req.options.unwrap_or_default())
        .await?;
    let embedding = resolved.backend.embed(&req.text, &resolved.options).await?;
    tracing::debug!(dimensions = embedding.len(), "embedded text");

    Ok(Json(EmbedResponse::from(embedding)))
}
