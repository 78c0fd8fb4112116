//! Locally hosted backend (Ollama-compatible)
//!
//! No credential. Streams are newline-delimited JSON rather than SSE: every
//! line is a complete object carrying `message.content`, with `done: true` on
//! the last one.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::codec::NdjsonDecoder;
use crate::logging::Logger;
use crate::types::{
    GenerationOptions, GenerationResult, Message, ProviderConfig, ProviderKind, ProviderMetadata,
    Usage,
};
use super::body::{self, BodyDecoder, DecodeStep};
use super::error::{ProviderError, ProviderResult};
use super::traits::{Provider, TextStream};

const KIND: ProviderKind = ProviderKind::Local;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ModelOptions<'a>>,
}

/// Sampling parameters, nested under `options` on this backend
#[derive(Debug, Default, Serialize)]
struct ModelOptions<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

impl<'a> ModelOptions<'a> {
    /// `None` when no option would be sent
    fn from_options(options: &'a GenerationOptions) -> Option<Self> {
        let mapped = Self {
            temperature: options.temperature,
            num_predict: options.max_tokens,
            top_p: options.top_p,
            frequency_penalty: options.frequency_penalty,
            presence_penalty: options.presence_penalty,
            stop: options.stop(),
        };
        let empty = mapped.temperature.is_none()
            && mapped.num_predict.is_none()
            && mapped.top_p.is_none()
            && mapped.frequency_penalty.is_none()
            && mapped.presence_penalty.is_none()
            && mapped.stop.is_none();
        if empty {
            None
        } else {
            Some(mapped)
        }
    }
}

/// One response object; the whole body for `chat`, one line for `chat_stream`
#[derive(Debug, Default, Deserialize)]
struct ChatLine {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<LineMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LineMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

/// Decodes NDJSON chat lines
pub(crate) struct LocalNdjsonDecoder {
    lines: NdjsonDecoder,
    logger: Arc<dyn Logger>,
}

impl LocalNdjsonDecoder {
    pub(crate) fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            lines: NdjsonDecoder::new(),
            logger,
        }
    }

    fn handle(&self, lines: impl IntoIterator<Item = ChatLine>) -> Vec<DecodeStep> {
        let mut steps = Vec::new();
        for line in lines {
            if let Some(error) = line.error {
                steps.push(DecodeStep::Error(ProviderError::stream(KIND.as_str(), error)));
                break;
            }
            if let Some(message) = line.message {
                steps.push(DecodeStep::Delta(message.content));
            }
            if line.done {
                self.logger.debug(&format!(
                    "[local] done: reason={}",
                    line.done_reason.as_deref().unwrap_or("unknown")
                ));
                steps.push(DecodeStep::End);
                break;
            }
        }
        steps
    }
}

impl BodyDecoder for LocalNdjsonDecoder {
    fn decode(&mut self, chunk: &[u8]) -> Vec<DecodeStep> {
        let lines: Vec<ChatLine> = self.lines.push(chunk);
        self.handle(lines)
    }

    fn finish(&mut self) -> Vec<DecodeStep> {
        let last: Option<ChatLine> = self.lines.finish();
        if self.lines.skipped() > 0 {
            self.logger.debug(&format!(
                "[local] skipped {} unparsable lines",
                self.lines.skipped()
            ));
        }
        self.handle(last)
    }
}

/// Adapter for a locally hosted model server
pub struct LocalProvider {
    client: Client,
    base_url: String,
    logger: Arc<dyn Logger>,
}

impl LocalProvider {
    pub fn new(base_url: Option<&str>, logger: Arc<dyn Logger>) -> ProviderResult<Self> {
        let base_url = body::normalize_base_url(base_url.unwrap_or(KIND.default_base_url()));
        if base_url.is_empty() {
            return Err(ProviderError::InvalidConfig(
                "local base URL must not be empty".to_string(),
            ));
        }
        Ok(Self {
            client: body::build_client()?,
            base_url,
            logger,
        })
    }

    /// Any credential on `config` is ignored
    pub fn from_config(config: &ProviderConfig, logger: Arc<dyn Logger>) -> ProviderResult<Self> {
        Self::new(Some(config.base_url_or_default()), logger)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> ProviderResult<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .json(payload)
            .send()
            .await?;
        body::ensure_success(KIND, response).await
    }
}

#[async_trait]
impl Provider for LocalProvider {
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
            "[local] chat: model={}, messages={}",
            model,
            messages.len()
        ));

        let request = ChatRequest {
            model,
            messages,
            stream: false,
            options: ModelOptions::from_options(options),
        };
        let response = self.post("api/chat", &request).await?;
        let parsed: ChatLine = body::read_json(KIND, response).await?;

        if let Some(error) = parsed.error {
            return Err(ProviderError::malformed(KIND, error));
        }

        let content = parsed.message.map(|m| m.content).unwrap_or_default();
        let mut result = GenerationResult::new(content);
        if parsed.prompt_eval_count.is_some() || parsed.eval_count.is_some() {
            result = result.with_usage(Usage::new(
                parsed.prompt_eval_count.unwrap_or(0),
                parsed.eval_count.unwrap_or(0),
            ));
        }
        if let Some(model) = parsed.model {
            result = result.with_model(model);
        }
        if let Some(reason) = parsed.done_reason {
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
            "[local] chat_stream: model={}, messages={}",
            model,
            messages.len()
        ));

        let request = ChatRequest {
            model,
            messages,
            stream: true,
            options: ModelOptions::from_options(options),
        };
        let response = self.post("api/chat", &request).await?;
        self.logger.debug("[local] stream opened");

        Ok(body::decode_stream(
            KIND,
            response.bytes_stream(),
            LocalNdjsonDecoder::new(Arc::clone(&self.logger)),
            Arc::clone(&self.logger),
        ))
    }

    async fn embed(&self, text: &str, options: &GenerationOptions) -> ProviderResult<Vec<f32>> {
        let model = options.model_or(KIND.default_embedding_model());
        self.logger
            .debug(&format!("[local] embed: model={}, chars={}", model, text.len()));

        let request = EmbeddingRequest {
            model,
            prompt: text,
        };
        let response = self.post("api/embeddings", &request).await?;
        let parsed: EmbeddingResponse = body::read_json(KIND, response).await?;
        if parsed.embedding.is_empty() {
            return Err(ProviderError::malformed(
                KIND,
                "embedding response contained no embedding",
            ));
        }
        Ok(parsed.embedding)
    }
}
