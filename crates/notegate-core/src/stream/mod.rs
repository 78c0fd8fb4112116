//! Server-side stream multiplexing
//!
//! Wraps a backend's [`TextStream`](crate::providers::TextStream) in the
//! application's SSE envelope: an optional `sources` frame, one `content`
//! frame per delta, then exactly one terminal (`[DONE]` or an `error` frame).

mod multiplexer;

pub use multiplexer::{stream_deadline, FrameStream, MuxState, StreamMultiplexer};

/// Response headers every SSE response carries
pub const SSE_HEADERS: [(&str, &str); 3] = [
    ("content-type", "text/event-stream"),
    ("cache-control", "no-cache"),
    ("connection", "keep-alive"),
];
