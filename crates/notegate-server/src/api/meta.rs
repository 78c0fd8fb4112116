//! Provider listing and liveness

use axum::Json;
use notegate_core::providers::supported_providers;
use notegate_core::types::ProviderMetadata;
use serde_json::{json, Value};

pub async fn providers() -> Json<Vec<ProviderMetadata>> {
    Json(supported_providers())
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
