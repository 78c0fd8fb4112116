use axum::extract::Request;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::api::{chat, embed, meta};
use crate::state::AppState;

/// Create the main API router.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri()
        )
    });

    let ai_routes = Router::new()
        .route("/chat", post(chat::chat))
        .route("/complete", post(chat::complete))
        .route("/embed", post(embed::embed))
        .route("/providers", get(meta::providers));

    Router::new()
        .nest("/api/ai", ai_routes)
        .route("/health", get(meta::health))
        .layer(trace_layer)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
