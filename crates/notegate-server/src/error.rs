//! HTTP error mapping

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use notegate_core::config::ConfigError;
use notegate_core::providers::{ErrorKind, ProviderError};
use notegate_core::types::ErrorBody;

/// Failure answered before any stream starts. Serialized as `{"error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body, unknown provider, invalid configuration
    #[error("{0}")]
    BadRequest(String),
    /// No usable credential for the selected provider
    #[error("{0}")]
    Unauthorized(String),
    /// The backend refused or could not be reached
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        if err.is_credential_error() {
            return Self::Unauthorized(message);
        }
        match err.kind() {
            ErrorKind::Config => Self::BadRequest(message),
            ErrorKind::Upstream | ErrorKind::Stream => Self::BadGateway(message),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "request failed: {}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "request rejected: {}", self);
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
