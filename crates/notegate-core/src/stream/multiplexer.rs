//! Frame sequencing for one streamed chat request

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use tokio::time::Instant;

use crate::config::DEFAULT_STREAM_TIMEOUT_SECS;
use crate::logging::Logger;
use crate::providers::{Provider, ProviderError, ProviderResult, TextStream};
use crate::types::{CancellationToken, GenerationOptions, Message, SourceRef, StreamFrame};

/// Frames in wire order; ends right after its terminal frame
pub type FrameStream = Pin<Box<dyn Stream<Item = StreamFrame> + Send>>;

/// Where a multiplexed stream is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxState {
    /// Nothing emitted yet
    Idle,
    /// Sources (if any) emitted, waiting for the first delta
    Sending,
    /// At least one content frame emitted
    Streaming,
    /// `[DONE]` emitted
    Done,
    /// An `error` frame emitted
    Errored,
}

impl MuxState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MuxState::Done | MuxState::Errored)
    }
}

/// Builds the frame stream for one request.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use notegate_core::logging::NoOpLogger;
/// # use notegate_core::stream::StreamMultiplexer;
/// # use notegate_core::types::SourceRef;
/// # async fn demo(deltas: notegate_core::providers::TextStream) {
/// let frames = StreamMultiplexer::new(Arc::new(NoOpLogger))
///     .with_sources(vec![SourceRef::new("p1", "Intro")])
///     .frames(deltas);
/// # }
/// ```
pub struct StreamMultiplexer {
    sources: Option<Vec<SourceRef>>,
    timeout: Duration,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    logger: Arc<dyn Logger>,
}

impl StreamMultiplexer {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            sources: None,
            timeout: Duration::from_secs(DEFAULT_STREAM_TIMEOUT_SECS),
            deadline: None,
            cancel: CancellationToken::new(),
            logger,
        }
    }

    /// Emit `pages` as the leading `sources` frame. An empty list emits nothing.
    pub fn with_sources(mut self, pages: Vec<SourceRef>) -> Self {
        self.sources = if pages.is_empty() { None } else { Some(pages) };
        self
    }

    /// Time budget for the whole stream, measured from `frames`/`open`
    /// unless a deadline was fixed with [`with_deadline`](Self::with_deadline)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fix the instant the budget runs out, e.g. one computed before the
    /// backend request was sent
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop with an `error` frame once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Open the backend stream, then multiplex it.
    ///
    /// Errors raised while opening (configuration, non-2xx) are returned to
    /// the caller instead of being framed.
    pub async fn open(
        self,
        provider: &dyn Provider,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> ProviderResult<FrameStream> {
        let deltas = provider.chat_stream(messages, options).await?;
        Ok(self.frames(deltas))
    }

    /// Multiplex an already open backend stream.
    ///
    /// The backend is polled only when the returned stream is polled.
    pub fn frames(self, deltas: TextStream) -> FrameStream {
        let state = MuxRun {
            state: MuxState::Idle,
            sources: self.sources,
            deltas: Some(deltas),
            deadline: self.deadline.or_else(|| stream_deadline(self.timeout)),
            timeout: self.timeout,
            cancel: self.cancel,
            logger: self.logger,
            emitted: 0,
        };
        Box::pin(stream::unfold(state, |mut run| async move {
            let frame = run.next_frame().await?;
            Some((frame, run))
        }))
    }
}

/// Instant `timeout` from now; `None` when it lies beyond what the clock can
/// represent, which means the stream never times out.
pub fn stream_deadline(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

enum Next {
    Item(Option<ProviderResult<String>>),
    Cancelled,
    TimedOut,
}

struct MuxRun {
    state: MuxState,
    sources: Option<Vec<SourceRef>>,
    deltas: Option<TextStream>,
    deadline: Option<Instant>,
    timeout: Duration,
    cancel: CancellationToken,
    logger: Arc<dyn Logger>,
    emitted: usize,
}

impl MuxRun {
    async fn next_frame(&mut self) -> Option<StreamFrame> {
        loop {
            match self.state {
                MuxState::Done | MuxState::Errored => return None,
                MuxState::Idle => {
                    self.state = MuxState::Sending;
                    if let Some(pages) = self.sources.take() {
                        self.logger
                            .debug(&format!("[stream] sending {} sources", pages.len()));
                        return Some(StreamFrame::sources(pages));
                    }
                }
                MuxState::Sending | MuxState::Streaming => {
                    let deltas = self.deltas.as_mut()?;
                    let next = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => Next::Cancelled,
                        _ = expire(self.deadline) => Next::TimedOut,
                        item = deltas.next() => Next::Item(item),
                    };

                    match next {
                        Next::Item(Some(Ok(text))) if text.is_empty() => continue,
                        Next::Item(Some(Ok(text))) => {
                            self.state = MuxState::Streaming;
                            self.emitted += 1;
                            return Some(StreamFrame::content(text));
                        }
                        Next::Item(Some(Err(e))) => return Some(self.fail(e)),
                        Next::Item(None) => {
                            self.logger.debug(&format!(
                                "[stream] done after {} content frames",
                                self.emitted
                            ));
                            self.state = MuxState::Done;
                            self.deltas = None;
                            return Some(StreamFrame::Done);
                        }
                        Next::Cancelled => return Some(self.fail(ProviderError::Cancelled)),
                        Next::TimedOut => {
                            return Some(self.fail(ProviderError::Timeout(self.timeout.as_secs())))
                        }
                    }
                }
            }
        }
    }

    /// Terminal error frame; releases the backend stream.
    fn fail(&mut self, error: ProviderError) -> StreamFrame {
        self.logger.warn(&format!(
            "[stream] failed after {} content frames: {}",
            self.emitted, error
        ));
        self.state = MuxState::Errored;
        self.deltas = None;
        StreamFrame::error(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::providers::{MockMode, MockProvider};

    fn logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger)
    }

    fn deltas(items: Vec<ProviderResult<String>>) -> TextStream {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_sources_content_done() {
        let frames: Vec<StreamFrame> = StreamMultiplexer::new(logger())
            .with_sources(vec![SourceRef::new("p1", "Intro")])
            .frames(deltas(vec![
                Ok("Hel".to_string()),
                Ok("lo, ".to_string()),
                Ok("world".to_string()),
            ]))
            .collect()
            .await;

        assert_eq!(
            frames,
            vec![
                StreamFrame::sources(vec![SourceRef::new("p1", "Intro")]),
                StreamFrame::content("Hel"),
                StreamFrame::content("lo, "),
                StreamFrame::content("world"),
                StreamFrame::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_deltas_skipped_and_no_sources() {
        let frames: Vec<StreamFrame> = StreamMultiplexer::new(logger())
            .with_sources(Vec::new())
            .frames(deltas(vec![Ok(String::new()), Ok("a".to_string())]))
            .collect()
            .await;
        assert_eq!(frames, vec![StreamFrame::content("a"), StreamFrame::Done]);
    }

    #[tokio::test]
    async fn test_error_is_sole_terminal() {
        let frames: Vec<StreamFrame> = StreamMultiplexer::new(logger())
            .frames(deltas(vec![
                Ok("partial".to_string()),
                Err(ProviderError::stream("openai", "connection reset")),
                Ok("never".to_string()),
            ]))
            .collect()
            .await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], StreamFrame::content("partial"));
        match &frames[1] {
            StreamFrame::Error { error } => assert!(error.contains("connection reset")),
            other => panic!("expected error frame, got {:?}", other),
        }
        assert!(!frames.contains(&StreamFrame::Done));
    }

    #[tokio::test]
    async fn test_empty_stream_is_just_done() {
        let frames: Vec<StreamFrame> = StreamMultiplexer::new(logger())
            .frames(deltas(Vec::new()))
            .collect()
            .await;
        assert_eq!(frames, vec![StreamFrame::Done]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_emits_error() {
        let provider = MockProvider::new(MockMode::Stall(vec!["slow".to_string()]), logger());
        let frames: Vec<StreamFrame> = StreamMultiplexer::new(logger())
            .with_timeout(Duration::from_secs(5))
            .open(&provider, &[Message::user("hi")], &GenerationOptions::default())
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(frames[0], StreamFrame::content("slow"));
        assert_eq!(
            frames[1],
            StreamFrame::error("Stream timed out after 5 seconds")
        );
        assert_eq!(frames.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_emits_error() {
        let provider = MockProvider::new(MockMode::Stall(vec!["a".to_string()]), logger());
        let cancel = CancellationToken::new();
        let mut frames = StreamMultiplexer::new(logger())
            .with_cancellation(cancel.clone())
            .open(&provider, &[Message::user("hi")], &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(frames.next().await, Some(StreamFrame::content("a")));
        cancel.cancel();
        assert_eq!(frames.next().await, Some(StreamFrame::error("Request cancelled")));
        assert_eq!(frames.next().await, None);
    }

    #[tokio::test]
    async fn test_open_returns_pre_stream_errors() {
        let provider = MockProvider::new(
            MockMode::Upstream {
                status: 401,
                message: "bad key".to_string(),
            },
            logger(),
        );
        let result = StreamMultiplexer::new(logger())
            .open(&provider, &[Message::user("hi")], &GenerationOptions::default())
            .await;
        assert!(matches!(result, Err(ProviderError::Upstream { status: Some(401), .. })));
    }

    #[tokio::test]
    async fn test_unrepresentable_budget_never_expires() {
        let frames: Vec<StreamFrame> = StreamMultiplexer::new(logger())
            .with_timeout(Duration::from_secs(u64::MAX))
            .frames(deltas(vec![Ok("a".to_string())]))
            .collect()
            .await;
        assert_eq!(frames, vec![StreamFrame::content("a"), StreamFrame::Done]);
        assert!(stream_deadline(Duration::from_secs(u64::MAX)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_deadline_counts_time_before_frames() {
        let provider = MockProvider::new(MockMode::Stall(vec!["slow".to_string()]), logger());
        let budget = Duration::from_secs(10);
        let deadline = stream_deadline(budget).unwrap();
        tokio::time::sleep(Duration::from_secs(8)).await;

        let started = Instant::now();
        let frames: Vec<StreamFrame> = StreamMultiplexer::new(logger())
            .with_timeout(budget)
            .with_deadline(deadline)
            .open(&provider, &[Message::user("hi")], &GenerationOptions::default())
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(frames.last(), Some(&StreamFrame::error("Stream timed out after 10 seconds")));
        assert!(started.elapsed() <= Duration::from_secs(2));
    }

    #[test]
    fn test_terminal_states() {
        assert!(MuxState::Done.is_terminal());
        assert!(MuxState::Errored.is_terminal());
        assert!(!MuxState::Streaming.is_terminal());
    }
}
