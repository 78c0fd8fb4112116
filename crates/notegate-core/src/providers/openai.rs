//! OpenAI-style chat completions backend
//!
//! `POST {base}/chat/completions` with bearer auth. Streaming responses are
//! SSE where each `data:` payload is a completion chunk and `data: [DONE]`
//! ends the stream.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::codec::{SseEvent, SseEventParser};
use crate::logging::Logger;
use crate::types::{
    GenerationOptions, GenerationResult, Message, ProviderConfig, ProviderKind, ProviderMetadata,
    Usage, DONE_SENTINEL,
};
use super::body::{self, BodyDecoder, DecodeStep};
use super::error::{ProviderError, ProviderResult};
use super::traits::{Provider, TextStream};

const KIND: ProviderKind = ProviderKind::OpenAi;

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
    stream: bool,
}

impl<'a> ChatRequest<'a> {
    fn new(
        model: &'a str,
        messages: &'a [Message],
        options: &'a GenerationOptions,
        stream: bool,
    ) -> Self {
        Self {
            model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            frequency_penalty: options.frequency_penalty,
            presence_penalty: options.presence_penalty,
            stop: options.stop(),
            stream,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: Option<u32>,
}

impl From<WireUsage> for Usage {
    fn from(usage: WireUsage) -> Self {
        let mut out = Usage::new(usage.prompt_tokens, usage.completion_tokens);
        if let Some(total) = usage.total_tokens {
            out.total_tokens = total;
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

// Stream decoding

/// Decodes completion chunks from an SSE body
pub(crate) struct OpenAiSseDecoder {
    parser: SseEventParser,
    logger: Arc<dyn Logger>,
}

impl OpenAiSseDecoder {
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
            if data == DONE_SENTINEL {
                steps.push(DecodeStep::End);
                break;
            }

            let chunk: StreamChunk = match serde_json::from_str(data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    self.logger
                        .debug(&format!("[openai] skipping unparsable frame: {}", e));
                    continue;
                }
            };

            if let Some(error) = chunk.error {
                let message = error
                    .message
                    .unwrap_or_else(|| "unknown stream error".to_string());
                steps.push(DecodeStep::Error(ProviderError::stream(KIND.as_str(), message)));
                break;
            }

            let text = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta)
                .and_then(|delta| delta.content);
            if let Some(text) = text {
                steps.push(DecodeStep::Delta(text));
            }
        }
        steps
    }
}

impl BodyDecoder for OpenAiSseDecoder {
    fn decode(&mut self, chunk: &[u8]) -> Vec<DecodeStep> {
        let events = self.parser.push(chunk);
        self.handle(events)
    }

    fn finish(&mut self) -> Vec<DecodeStep> {
        let events = self.parser.finish();
        self.handle(events)
    }
}

// Provider

/// Adapter for OpenAI-compatible chat and embedding APIs
pub struct OpenAiProvider {
    client: Client,
    credential: String,
    base_url: String,
    logger: Arc<dyn Logger>,
}

impl OpenAiProvider {
    /// Create an adapter. Fails before any network call when `credential` is blank.
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
            logger,
        })
    }

    pub fn from_config(config: &ProviderConfig, logger: Arc<dyn Logger>) -> ProviderResult<Self> {
        let credential = config
            .credential()
            .ok_or_else(|| ProviderError::missing_credential(KIND))?;
        Self::new(credential, Some(config.base_url_or_default()), logger)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> ProviderResult<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.credential)
            .json(payload)
            .send()
            .await?;
        body::ensure_success(KIND, response).await
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
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
            "[openai] chat: model={}, messages={}",
            model,
            messages.len()
        ));

        let request = ChatRequest::new(model, messages, options, false);
        let response = self.post("chat/completions", &request).await?;
        let parsed: ChatResponse = body::read_json(KIND, response).await?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::malformed(KIND, "response contained no choices"))?;

        let content = choice.message.and_then(|m| m.content).unwrap_or_default();
        let mut result = GenerationResult::new(content);
        if let Some(usage) = parsed.usage {
            result = result.with_usage(usage.into());
        }
        if let Some(model) = parsed.model {
            result = result.with_model(model);
        }
        if let Some(reason) = choice.finish_reason {
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
            "[openai] chat_stream: model={}, messages={}",
            model,
            messages.len()
        ));

        let request = ChatRequest::new(model, messages, options, true);
        let response = self.post("chat/completions", &request).await?;
        self.logger.debug("[openai] stream opened");

        Ok(body::decode_stream(
            KIND,
            response.bytes_stream(),
            OpenAiSseDecoder::new(Arc::clone(&self.logger)),
            Arc::clone(&self.logger),
        ))
    }

    async fn embed(&self, text: &str, options: &GenerationOptions) -> ProviderResult<Vec<f32>> {
        let model = options.model_or(KIND.default_embedding_model());
        self.logger
            .debug(&format!("[openai] embed: model={}, chars={}", model, text.len()));

        let request = EmbeddingRequest { model, input: text };
        let response = self.post("embeddings", &request).await?;
        let parsed: EmbeddingResponse = body::read_json(KIND, response).await?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::malformed(KIND, "embedding response contained no data"))
    }
}
