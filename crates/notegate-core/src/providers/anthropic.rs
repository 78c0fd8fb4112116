//! Anthropic messages backend
//!
//! `POST {base}/messages` with `x-api-key` auth. System turns are lifted into
//! the top-level `system` field. Streams are SSE with typed events; only text
//! deltas carry output. Embeddings are delegated to an OpenAI-style adapter.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::codec::{SseEvent, SseEventParser};
use crate::logging::Logger;
use crate::types::{
    GenerationOptions, GenerationResult, Message, MessageRole, ProviderConfig, ProviderKind,
    ProviderMetadata, Usage,
};
use super::body::{self, BodyDecoder, DecodeStep};
use super::error::{ProviderError, ProviderResult};
use super::openai::OpenAiProvider;
use super::traits::{Provider, TextStream};

const KIND: ProviderKind = ProviderKind::Anthropic;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// `max_tokens` is mandatory for this backend
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> MessagesRequest<'a> {
    fn new(
        model: &'a str,
        messages: &'a [Message],
        options: &'a GenerationOptions,
        stream: bool,
    ) -> Self {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.is_system())
            .map(|m| m.content.as_str())
            .collect();
        let system = if system.is_empty() {
            None
        } else {
            Some(system.join("\n\n"))
        };

        let messages = messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| WireMessage {
                role: match m.role {
                    MessageRole::Assistant => "assistant",
                    _ => "user",
                },
                content: &m.content,
            })
            .collect();

        Self {
            model,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            temperature: options.temperature,
            top_p: options.top_p,
            stop_sequences: options.stop(),
            stream,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: BlockDelta },
    MessageStop,
    Error { error: WireError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: Option<String>,
}

/// Decodes typed message events from an SSE body
pub(crate) struct AnthropicSseDecoder {
    parser: SseEventParser,
    logger: Arc<dyn Logger>,
}

impl AnthropicSseDecoder {
    pub(crate) fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            parser: SseEventParser::new(),
            logger,
        }
    }

    fn handle(&self, events: Vec<SseEvent>) -> Vec<DecodeStep> {
        let mut steps = Vec::new();
        for event in events {
            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            let parsed: StreamEvent = match serde_json::from_str(data) {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.logger.debug(&format!(
                        "[anthropic] skipping unparsable {} event: {}",
                        event.event.as_deref().unwrap_or("unnamed"),
                        e
                    ));
                    continue;
                }
            };

            match parsed {
                StreamEvent::ContentBlockDelta {
                    delta: BlockDelta::TextDelta { text },
                } => steps.push(DecodeStep::Delta(text)),
                StreamEvent::MessageStop => {
                    steps.push(DecodeStep::End);
                    break;
                }
                StreamEvent::Error { error } => {
                    let message = error
                        .message
                        .unwrap_or_else(|| "unknown stream error".to_string());
                    steps.push(DecodeStep::Error(ProviderError::stream(KIND.as_str(), message)));
                    break;
                }
                _ => {}
            }
        }
        steps
    }
}

impl BodyDecoder for AnthropicSseDecoder {
    fn decode(&mut self, chunk: &[u8]) -> Vec<DecodeStep> {
        let events = self.parser.push(chunk);
        self.handle(events)
    }

    fn finish(&mut self) -> Vec<DecodeStep> {
        let events = self.parser.finish();
        self.handle(events)
    }
}

/// Adapter for the Anthropic messages API
pub struct AnthropicProvider {
    client: Client,
    credential: String,
    base_url: String,
    embedder: Option<OpenAiProvider>,
    logger: Arc<dyn Logger>,
}

impl AnthropicProvider {
    pub fn new(
        credential: impl Into<String>,
        base_url: Option<&str>,
        logger: Arc<dyn Logger>,
    ) -> ProviderResult<Self> {
        let credential = credential.into();
        if credential.trim().is_empty() {
            return Err(ProviderError::missing_credential(KIND));
        }
        let base_url = body::normalize_base_url(base_url.unwrap_or(KIND.default_base_url()));
        Ok(Self {
            client: body::build_client()?,
            credential,
            base_url,
            embedder: None,
            logger,
        })
    }

    /// Enable `embed` by delegating to an OpenAI adapter built from `credential`
    pub fn with_embedding_credential(mut self, credential: impl Into<String>) -> ProviderResult<Self> {
        let embedder = OpenAiProvider::new(credential, None, Arc::clone(&self.logger))?;
        self.embedder = Some(embedder);
        Ok(self)
    }

    pub fn from_config(config: &ProviderConfig, logger: Arc<dyn Logger>) -> ProviderResult<Self> {
        let credential = config
            .credential()
            .ok_or_else(|| ProviderError::missing_credential(KIND))?;
        let provider = Self::new(credential, Some(config.base_url_or_default()), logger)?;
        match config.embedding_credential() {
            Some(embedding) => provider.with_embedding_credential(embedding),
            None => Ok(provider),
        }
    }

    pub fn can_embed(&self) -> bool {
        self.embedder.is_some()
    }

    async fn post(&self, request: &MessagesRequest<'_>) -> ProviderResult<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.credential)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;
        body::ensure_success(KIND, response).await
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        KIND.as_str()
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn default_model(&self) -> &str {
        KIND.default_model()
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::from(KIND)
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> ProviderResult<GenerationResult> {
        let model = options.model_or(self.default_model());
        self.logger.debug(&format!(
            "[anthropic] chat: model={}, messages={}",
            model,
            messages.len()
        ));

        let request = MessagesRequest::new(model, messages, options, false);
        let response = self.post(&request).await?;
        let parsed: MessagesResponse = body::read_json(KIND, response).await?;

        let content: String = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();

        let mut result = GenerationResult::new(content);
        if let Some(usage) = parsed.usage {
            result = result.with_usage(Usage::new(usage.input_tokens, usage.output_tokens));
        }
        if let Some(model) = parsed.model {
            result = result.with_model(model);
        }
        if let Some(reason) = parsed.stop_reason {
            result = result.with_finish_reason(reason);
        }
        Ok(result)
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> ProviderResult<TextStream> {
        let model = options.model_or(self.default_model());
        self.logger.debug(&format!(
            "[anthropic] chat_stream: model={}, messages={}",
            model,
            messages.len()
        ));

        let request = MessagesRequest::new(model, messages, options, true);
        let response = self.post(&request).await?;
        self.logger.debug("[anthropic] stream opened");

        Ok(body::decode_stream(
            KIND,
            response.bytes_stream(),
            AnthropicSseDecoder::new(Arc::clone(&self.logger)),
            Arc::clone(&self.logger),
        ))
    }

    async fn embed(&self, text: &str, options: &GenerationOptions) -> ProviderResult<Vec<f32>> {
        match &self.embedder {
            Some(embedder) => {
                self.logger.debug("[anthropic] embed: delegating to openai");
                embedder.embed(text, options).await
            }
            None => Err(ProviderError::EmbeddingCredentialRequired),
        }
    }
}
