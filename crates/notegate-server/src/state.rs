//! Shared application state and per-request backend resolution

use std::sync::Arc;
use std::time::Duration;

use notegate_core::config::SettingsProvider;
use notegate_core::logging::SharedLogger;
use notegate_core::providers::{
    create_backend, create_backend_from_settings, create_embedding_backend_from_settings, Backend,
};
use notegate_core::retrieval::{ContextRetriever, DEFAULT_CONTEXT_LIMIT};
use notegate_core::types::{GenerationOptions, ProviderConfig};

use crate::error::ApiError;

/// Shared by every handler; cheap to clone
#[derive(Clone)]
pub struct AppState {
    /// Persisted settings, read once per request
    pub settings: Arc<dyn SettingsProvider>,
    /// Optional context source for chat requests
    pub retriever: Option<Arc<dyn ContextRetriever>>,
    pub context_limit: usize,
    /// Overrides the settings' stream budget when set
    pub stream_timeout: Option<Duration>,
    pub logger: SharedLogger,
}

/// Backend plus the effective options and budget for one request
pub struct Resolved {
    pub backend: Backend,
    pub options: GenerationOptions,
    pub timeout: Duration,
}

impl AppState {
    pub fn new(settings: Arc<dyn SettingsProvider>, logger: SharedLogger) -> Self {
        Self {
            settings,
            retriever: None,
            context_limit: DEFAULT_CONTEXT_LIMIT,
            stream_timeout: None,
            logger,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn ContextRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = Some(timeout);
        self
    }

    /// Chat backend for a request.
    ///
    /// A caller-supplied `provider` replaces the persisted settings entirely;
    /// otherwise the settings pick the backend and fill in the model.
    pub async fn resolve_chat(
        &self,
        provider: Option<&ProviderConfig>,
        options: GenerationOptions,
    ) -> Result<Resolved, ApiError> {
        let settings = self.settings.get_settings().await?;
        let timeout = self.stream_timeout.unwrap_or_else(|| settings.stream_timeout());

        let (backend, options) = match provider {
            Some(config) => (create_backend(config, self.logger.clone())?, options),
            None => {
                let secrets = settings.secret_store();
                let backend = create_backend_from_settings(&settings, &secrets, self.logger.clone())?;
                (backend, settings.chat_options(options))
            }
        };
        tracing::debug!(provider = %backend.kind(), "resolved chat backend");

        Ok(Resolved {
            backend,
            options,
            timeout,
        })
    }

    /// Embedding backend for a request; same override rules as `resolve_chat`
    pub async fn resolve_embedding(
        &self,
        provider: Option<&ProviderConfig>,
        options: GenerationOptions,
    ) -> Result<Resolved, ApiError> {
        let settings = self.settings.get_settings().await?;
        let timeout = self.stream_timeout.unwrap_or_else(|| settings.stream_timeout());

        let (backend, options) = match provider {
            Some(config) => (create_backend(config, self.logger.clone())?, options),
            None => {
                let secrets = settings.secret_store();
                let backend = create_embedding_backend_from_settings(
                    &settings,
                    &secrets,
                    self.logger.clone(),
                )?;
                (backend, settings.embedding_options(options))
            }
        };
        tracing::debug!(provider = %backend.kind(), "resolved embedding backend");

        Ok(Resolved {
            backend,
            options,
            timeout,
        })
    }
}
