//! Client side of the gateway's SSE stream
//!
//! - [`FrameDecoder`]: bytes in, [`StreamFrame`](crate::types::StreamFrame)s out
//! - [`StreamConsumer`]: drives a decoder over a body, accumulating text
//! - [`RequestSlot`]: one in-flight request per UI surface
//! - [`GatewayClient`]: HTTP client for the gateway endpoints

mod decoder;
mod consumer;
mod slot;
mod http;

pub use crate::codec::LineBuffer as SseLineBuffer;
pub use decoder::FrameDecoder;
pub use consumer::{ConsumeError, ConsumeOutcome, ConsumeResult, ConsumeStatus, StreamConsumer};
pub use slot::RequestSlot;
pub use http::GatewayClient;
