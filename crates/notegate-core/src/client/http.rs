//! HTTP client for the gateway endpoints

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::logging::Logger;
use crate::types::{
    CancellationToken, ChatRequest, EmbedRequest, EmbedResponse, ErrorBody, GenerationResult,
    ProviderMetadata, StreamFrame,
};
use super::consumer::{ConsumeError, ConsumeOutcome, ConsumeResult, ConsumeStatus, StreamConsumer};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to a running gateway server
pub struct GatewayClient {
    client: Client,
    base_url: String,
    consumer: StreamConsumer,
    logger: Arc<dyn Logger>,
}

impl GatewayClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8787`
    pub fn new(base_url: impl Into<String>, logger: Arc<dyn Logger>) -> ConsumeResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            consumer: StreamConsumer::new(Arc::clone(&logger)),
            logger,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Stream a chat response, calling `on_event` for each frame.
    ///
    /// A refusal before streaming (bad provider, missing credential, upstream
    /// rejection) is `ConsumeError::Http` carrying the gateway's message.
    pub async fn chat<F>(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        on_event: F,
    ) -> ConsumeResult<ConsumeOutcome>
    where
        F: FnMut(&StreamFrame),
    {
        self.logger
            .debug(&format!("[client] chat: {} messages", request.messages.len()));
        let send = self.client.post(self.url("/api/ai/chat")).json(request).send();
        let response = match cancel.run_until_cancelled(send).await {
            Some(response) => response?,
            None => {
                return Ok(ConsumeOutcome {
                    status: ConsumeStatus::Aborted,
                    text: String::new(),
                    sources: Vec::new(),
                })
            }
        };
        let response = Self::check(response).await?;
        self.consumer
            .consume(response.bytes_stream(), cancel, on_event)
            .await
    }

    /// Non-streaming completion
    pub async fn complete(&self, request: &ChatRequest) -> ConsumeResult<GenerationResult> {
        let response = self
            .client
            .post(self.url("/api/ai/complete"))
            .json(request)
            .send()
            .await?;
        Self::json(response).await
    }

    pub async fn embed(&self, request: &EmbedRequest) -> ConsumeResult<EmbedResponse> {
        let response = self
            .client
            .post(self.url("/api/ai/embed"))
            .json(request)
            .send()
            .await?;
        Self::json(response).await
    }

    pub async fn providers(&self) -> ConsumeResult<Vec<ProviderMetadata>> {
        let response = self.client.get(self.url("/api/ai/providers")).send().await?;
        Self::json(response).await
    }

    /// Map a non-2xx response to `ConsumeError::Http`, preferring its `{error}` body
    async fn check(response: Response) -> ConsumeResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Err(ConsumeError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> ConsumeResult<T> {
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ConsumeError::Decode(e.to_string()))
    }
}
