//! Provider trait definition

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::types::{GenerationOptions, GenerationResult, Message, ProviderMetadata};
use super::error::ProviderResult;

/// Lazily pulled sequence of text deltas.
///
/// Terminated by the backend; not restartable. Dropping it releases the
/// underlying connection.
pub type TextStream = Pin<Box<dyn Stream<Item = ProviderResult<String>> + Send>>;

/// Uniform contract every backend adapter implements.
///
/// Each call issues exactly one outbound request to the adapter's base URL and
/// never retries.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn name(&self) -> &str;

    /// Base URL requests are sent to
    fn base_url(&self) -> &str;

    /// Model used when options carry none
    fn default_model(&self) -> &str;

    /// Get provider metadata
    fn metadata(&self) -> ProviderMetadata;

    /// Single blocking round-trip
    async fn chat(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult>;

    /// Stream a chat completion as text deltas
    async fn chat_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> ProviderResult<TextStream>;

    /// Embed a single text
    async fn embed(&self, text: &str, options: &GenerationOptions) -> ProviderResult<Vec<f32>>;
}
