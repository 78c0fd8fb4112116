//! Mock provider for testing
//!
//! Deterministic, configurable responses without network dependencies. Used
//! to drive the stream multiplexer and the HTTP layer in tests.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::traits::{Provider, TextStream};
use crate::logging::Logger;
use crate::types::{
    last_user_content, GenerationOptions, GenerationResult, Message, ProviderKind, ProviderMetadata,
    Usage,
};

/// Mock response mode
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Echo back the last user message
    #[default]
    Echo,
    /// Return response as these exact chunks
    Chunks(Vec<String>),
    /// Yield `chunks`, then fail with a stream error carrying `message`
    Error { chunks: Vec<String>, message: String },
    /// Refuse to open the stream, as a backend answering non-2xx would
    Upstream { status: u16, message: String },
    /// Yield `chunks`, then never finish
    Stall(Vec<String>),
}

/// Mock LLM provider for testing
pub struct MockProvider {
    mode: MockMode,
    chunk_delay: Duration,
    dimensions: usize,
    received: Mutex<Vec<Vec<Message>>>,
    logger: Arc<dyn Logger>,
}

impl MockProvider {
    pub fn new(mode: MockMode, logger: Arc<dyn Logger>) -> Self {
        Self {
            mode,
            chunk_delay: Duration::ZERO,
            dimensions: 8,
            received: Mutex::new(Vec::new()),
            logger,
        }
    }

    /// Create an echo provider (echoes back user message)
    pub fn echo(logger: Arc<dyn Logger>) -> Self {
        Self::new(MockMode::Echo, logger)
    }

    /// Create a chunked response provider
    pub fn chunked<S: Into<String>>(chunks: impl IntoIterator<Item = S>, logger: Arc<dyn Logger>) -> Self {
        Self::new(
            MockMode::Chunks(chunks.into_iter().map(Into::into).collect()),
            logger,
        )
    }

    /// Create a provider whose stream fails after `chunks`
    pub fn failing<S: Into<String>>(
        chunks: impl IntoIterator<Item = S>,
        message: impl Into<String>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self::new(
            MockMode::Error {
                chunks: chunks.into_iter().map(Into::into).collect(),
                message: message.into(),
            },
            logger,
        )
    }

    /// Set the delay before each chunk after the first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Length of vectors returned by `embed`
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Every message list this provider was called with, oldest first
    pub fn received(&self) -> Vec<Vec<Message>> {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, messages: &[Message]) {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());
    }

    /// Chunks for `messages`, plus the error to raise once they are exhausted
    fn script(&self, messages: &[Message]) -> ProviderResult<(Vec<String>, Option<String>, bool)> {
        match &self.mode {
            MockMode::Echo => {
                let text = last_user_content(messages).unwrap_or("Hello from MockProvider!");
                Ok((vec![format!("Echo: {}", text)], None, false))
            }
            MockMode::Chunks(chunks) => Ok((chunks.clone(), None, false)),
            MockMode::Error { chunks, message } => Ok((chunks.clone(), Some(message.clone()), false)),
            MockMode::Upstream { status, message } => Err(ProviderError::upstream(
                ProviderKind::OpenAi,
                *status,
                message.clone(),
            )),
            MockMode::Stall(chunks) => Ok((chunks.clone(), None, true)),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn base_url(&self) -> &str {
        "http://localhost:0/mock"
    }

    fn default_model(&self) -> &str {
        "mock-echo"
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            id: "mock".to_string(),
            display_name: "Mock Provider".to_string(),
            default_base_url: self.base_url().to_string(),
            requires_credential: false,
            default_model: self.default_model().to_string(),
            default_embedding_model: "mock-embed".to_string(),
        }
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult> {
        self.record(messages);
        let (chunks, error, _) = self.script(messages)?;
        if let Some(message) = error {
            return Err(ProviderError::stream("mock", message));
        }
        let content = chunks.concat();
        let completion = (content.len() / 4) as u32;
        Ok(GenerationResult::new(content)
            .with_model(options.model_or(self.default_model()))
            .with_usage(Usage::new(0, completion))
            .with_finish_reason("stop"))
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        _options: &GenerationOptions,
    ) -> ProviderResult<TextStream> {
        self.record(messages);
        let (chunks, error, stall) = self.script(messages)?;
        self.logger.debug(&format!(
            "MockProvider: streaming {} chunks (error: {}, stall: {})",
            chunks.len(),
            error.is_some(),
            stall
        ));

        let delay = self.chunk_delay;
        let items = stream::iter(chunks.into_iter().enumerate()).then(move |(i, chunk)| async move {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, ProviderError>(chunk)
        });
        let tail = stream::iter(error.map(|message| Err(ProviderError::stream("mock", message))));

        let body: TextStream = if stall {
            Box::pin(items.chain(tail).chain(stream::pending()))
        } else {
            Box::pin(items.chain(tail))
        };
        Ok(body)
    }

    async fn embed(&self, text: &str, _options: &GenerationOptions) -> ProviderResult<Vec<f32>> {
        let seed = text.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        Ok((0..self.dimensions)
            .map(|i| ((seed.wrapping_add(i as u32) % 1000) as f32) / 1000.0)
            .collect())
    }
}
