//! Drives a [`FrameDecoder`] over a response body

use std::fmt::Display;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use thiserror::Error;

use crate::logging::Logger;
use crate::types::{CancellationToken, SourceRef, StreamFrame};
use super::decoder::FrameDecoder;

/// Failures of the transport itself. Everything the gateway reports in-band
/// ends up in [`ConsumeStatus`] instead.
#[derive(Debug, Error)]
pub enum ConsumeError {
    /// Connection failed or broke while reading
    #[error("transport error: {0}")]
    Transport(String),

    /// Gateway refused the request before streaming
    #[error("gateway error ({status}): {message}")]
    Http { status: u16, message: String },

    /// A non-streaming response body could not be decoded
    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ConsumeError {
    fn from(e: reqwest::Error) -> Self {
        ConsumeError::Transport(e.to_string())
    }
}

pub type ConsumeResult<T> = Result<T, ConsumeError>;

/// How a consumed stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeStatus {
    /// `[DONE]` received
    Completed,
    /// An `error` frame received
    Errored(String),
    /// The caller's token fired; not a failure
    Aborted,
    /// Body ended without a terminal frame
    Truncated,
}

/// Everything collected from one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeOutcome {
    pub status: ConsumeStatus,
    /// Concatenated content deltas, partial when not `Completed`
    pub text: String,
    pub sources: Vec<SourceRef>,
}

impl ConsumeOutcome {
    fn new() -> Self {
        Self {
            status: ConsumeStatus::Truncated,
            text: String::new(),
            sources: Vec::new(),
        }
    }

    fn with_status(mut self, status: ConsumeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.status == ConsumeStatus::Completed
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ConsumeStatus::Errored(message) => Some(message),
            _ => None,
        }
    }
}

/// Reads gateway SSE bodies.
///
/// Holds no per-stream state: every `consume` call starts with a fresh
/// decoder and accumulator.
#[derive(Clone)]
pub struct StreamConsumer {
    logger: Arc<dyn Logger>,
}

impl StreamConsumer {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    /// Read `body` to its terminal frame, calling `on_event` for every frame
    /// in order.
    ///
    /// Cancellation through `cancel` stops the read promptly and yields
    /// `Aborted` with whatever text arrived. Only transport failures are `Err`.
    pub async fn consume<S, B, E, F>(
        &self,
        body: S,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> ConsumeResult<ConsumeOutcome>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
        F: FnMut(&StreamFrame),
    {
        futures::pin_mut!(body);
        let mut decoder = FrameDecoder::new();
        let mut outcome = ConsumeOutcome::new();

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.logger.debug("[client] stream aborted");
                    return Ok(outcome.with_status(ConsumeStatus::Aborted));
                }
                chunk = body.next() => chunk,
            };

            let bytes = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => {
                    self.logger.error(&format!("[client] read failed: {}", e));
                    return Err(ConsumeError::Transport(e.to_string()));
                }
                None => {
                    self.logger.warn(&format!(
                        "[client] body ended without terminal frame ({} bytes pending)",
                        decoder.pending_len()
                    ));
                    return Ok(outcome.with_status(ConsumeStatus::Truncated));
                }
            };

            for frame in decoder.push(bytes.as_ref()) {
                on_event(&frame);
                match frame {
                    StreamFrame::Sources { pages } => outcome.sources = pages,
                    StreamFrame::Content { text } => outcome.text.push_str(&text),
                    StreamFrame::Error { error } => {
                        return Ok(outcome.with_status(ConsumeStatus::Errored(error)));
                    }
                    StreamFrame::Done => return Ok(outcome.with_status(ConsumeStatus::Completed)),
                }
            }
        }
    }
}
