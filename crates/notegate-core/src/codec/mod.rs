//! Byte-level framing shared by the backend adapters and the client consumer
//!
//! Every decoder here is an explicit accumulator: callers own it, feed it
//! chunks as they arrive, and flush it when the body ends.

mod line_buffer;
mod sse;
mod ndjson;

pub use line_buffer::LineBuffer;
pub use sse::{SseEvent, SseEventParser};
pub use ndjson::NdjsonDecoder;
