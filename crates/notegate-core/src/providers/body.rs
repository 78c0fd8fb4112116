//! Shared plumbing for turning an HTTP response body into a `TextStream`

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use reqwest::Client;

use crate::logging::Logger;
use crate::types::ProviderKind;
use super::error::{ProviderError, ProviderResult};
use super::traits::TextStream;

/// Connect timeout for every backend client. There is no total timeout so
/// long-running streams are not cut by the client itself.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// What a decoder extracted from one chunk of body
#[derive(Debug)]
pub(crate) enum DecodeStep {
    /// A text delta to yield
    Delta(String),
    /// A backend-reported failure; ends the stream
    Error(ProviderError),
    /// The backend signalled completion; anything after it is ignored
    End,
}

/// Backend-specific body decoder driven by [`decode_stream`]
pub(crate) trait BodyDecoder: Send + 'static {
    fn decode(&mut self, chunk: &[u8]) -> Vec<DecodeStep>;

    /// Called once when the body ends without an explicit `End`
    fn finish(&mut self) -> Vec<DecodeStep>;
}

pub(crate) fn build_client() -> ProviderResult<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::InvalidConfig(e.to_string()))
}

/// Strip trailing slashes so paths can be appended with a single `/`
pub(crate) fn normalize_base_url(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

/// Turn a non-2xx response into an `Upstream` error carrying status and body.
pub(crate) async fn ensure_success(
    kind: ProviderKind,
    response: reqwest::Response,
) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::upstream(kind, status.as_u16(), body))
}

/// Parse a successful JSON body into the backend's response schema.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    kind: ProviderKind,
    response: reqwest::Response,
) -> ProviderResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ProviderError::malformed(kind, format!("unexpected response body: {}", e)))
}

struct BodyState<D> {
    body: BoxStream<'static, Result<Vec<u8>, String>>,
    decoder: D,
    queue: VecDeque<ProviderResult<String>>,
    finished: bool,
}

impl<D: BodyDecoder> BodyState<D> {
    /// Queue the results of `steps`, marking the state finished on `Error` or `End`.
    fn apply(&mut self, steps: Vec<DecodeStep>) {
        for step in steps {
            match step {
                DecodeStep::Delta(text) if text.is_empty() => {}
                DecodeStep::Delta(text) => self.queue.push_back(Ok(text)),
                DecodeStep::Error(err) => {
                    self.queue.push_back(Err(err));
                    self.finished = true;
                    return;
                }
                DecodeStep::End => {
                    self.finished = true;
                    return;
                }
            }
        }
    }
}

/// Drive `decoder` over a chunked body, yielding text deltas lazily.
///
/// The body is only polled when the consumer polls. Dropping the returned
/// stream drops the body and with it the connection.
pub(crate) fn decode_stream<S, B, E, D>(
    provider: ProviderKind,
    body: S,
    decoder: D,
    logger: Arc<dyn Logger>,
) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + 'static,
    E: Display + 'static,
    D: BodyDecoder,
{
    let body = body
        .map(|chunk| chunk.map(|b| b.as_ref().to_vec()).map_err(|e| e.to_string()))
        .boxed();

    let state = BodyState {
        body,
        decoder,
        queue: VecDeque::new(),
        finished: false,
    };

    let stream = stream::unfold(state, move |mut state| {
        let logger = Arc::clone(&logger);
        async move {
            loop {
                if let Some(item) = state.queue.pop_front() {
                    return Some((item, state));
                }
                if state.finished {
                    logger.debug(&format!("[{}] stream finished", provider));
                    return None;
                }

                match state.body.next().await {
                    Some(Ok(chunk)) => {
                        let steps = state.decoder.decode(&chunk);
                        state.apply(steps);
                    }
                    Some(Err(e)) => {
                        logger.error(&format!("[{}] stream read failed: {}", provider, e));
                        state
                            .queue
                            .push_back(Err(ProviderError::stream(provider.as_str(), e)));
                        state.finished = true;
                    }
                    None => {
                        let steps = state.decoder.finish();
                        state.apply(steps);
                        state.finished = true;
                    }
                }
            }
        }
    });

    Box::pin(stream)
}
