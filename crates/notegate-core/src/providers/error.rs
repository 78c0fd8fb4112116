//! Provider error types

use thiserror::Error;

use crate::types::{ProviderKind, UnknownProvider};

/// Coarse classification used for propagation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing/invalid credential or provider selection; raised before any network call
    Config,
    /// Non-2xx or malformed response from a backend
    Upstream,
    /// Failure while draining an already open stream
    Stream,
}

/// Errors that can occur during provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Missing credential for a provider that requires one
    #[error("API key is required for {provider}")]
    MissingCredential { provider: ProviderKind },

    /// Settings select a provider but no credential is stored for it
    #[error("No credential configured for provider {provider}")]
    NoProviderConfigured { provider: ProviderKind },

    /// Provider name did not resolve to a known backend
    #[error(transparent)]
    UnknownProvider(#[from] UnknownProvider),

    /// Embeddings requested from a backend that delegates them but has no credential to delegate with
    #[error("embeddings require an OpenAI-compatible credential")]
    EmbeddingCredentialRequired,

    /// Any other configuration problem (bad base URL, client construction)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backend answered with a non-2xx status or an unusable payload
    #[error("{provider} API error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Upstream {
        provider: ProviderKind,
        status: Option<u16>,
        message: String,
    },

    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure reported while a stream was being drained
    #[error("{provider} stream error: {message}")]
    Stream { provider: String, message: String },

    /// Streamed request exceeded its time budget
    #[error("Stream timed out after {0} seconds")]
    Timeout(u64),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Create an upstream error carrying the response status and body
    pub fn upstream(provider: ProviderKind, status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider,
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create an upstream error for a well-formed HTTP exchange with an unusable body
    pub fn malformed(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider,
            status: None,
            message: message.into(),
        }
    }

    /// Create a missing credential error
    pub fn missing_credential(provider: ProviderKind) -> Self {
        Self::MissingCredential { provider }
    }

    /// Create a stream error
    pub fn stream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential { .. }
            | Self::NoProviderConfigured { .. }
            | Self::UnknownProvider(_)
            | Self::EmbeddingCredentialRequired
            | Self::InvalidConfig(_) => ErrorKind::Config,
            Self::Upstream { .. } | Self::Http(_) | Self::Json(_) => ErrorKind::Upstream,
            Self::Stream { .. } | Self::Timeout(_) | Self::Cancelled => ErrorKind::Stream,
        }
    }

    pub fn is_config(&self) -> bool {
        self.kind() == ErrorKind::Config
    }

    /// Whether the error stems from absent credentials (as opposed to a bad selection)
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential { .. }
                | Self::NoProviderConfigured { .. }
                | Self::EmbeddingCredentialRequired
        )
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
