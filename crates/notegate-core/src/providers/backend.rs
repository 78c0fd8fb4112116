//! The closed set of backends

use async_trait::async_trait;

use crate::types::{GenerationOptions, GenerationResult, Message, ProviderKind, ProviderMetadata};
use super::anthropic::AnthropicProvider;
use super::error::ProviderResult;
use super::local::LocalProvider;
use super::openai::OpenAiProvider;
use super::traits::{Provider, TextStream};

/// One of the three supported backend adapters
///
/// Produced by the factory; implements [`Provider`] by delegating to the
/// wrapped adapter.
pub enum Backend {
    OpenAi(OpenAiProvider),
    Anthropic(AnthropicProvider),
    Local(LocalProvider),
}

impl Backend {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Backend::OpenAi(_) => ProviderKind::OpenAi,
            Backend::Anthropic(_) => ProviderKind::Anthropic,
            Backend::Local(_) => ProviderKind::Local,
        }
    }

    fn inner(&self) -> &dyn Provider {
        match self {
            Backend::OpenAi(p) => p,
            Backend::Anthropic(p) => p,
            Backend::Local(p) => p,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("kind", &self.kind())
            .field("base_url", &self.base_url())
            .finish()
    }
}

#[async_trait]
impl Provider for Backend {
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    fn base_url(&self) -> &str {
        self.inner().base_url()
    }

    fn default_model(&self) -> &str {
        self.inner().default_model()
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::from(self.kind())
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult> {
        self.inner().chat(messages, options).await
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> ProviderResult<TextStream> {
        self.inner().chat_stream(messages, options).await
    }

    async fn embed(&self, text: &str, options: &GenerationOptions) -> ProviderResult<Vec<f32>> {
        self.inner().embed(text, options).await
    }
}
