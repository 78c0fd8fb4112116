//! Core types for gateway interactions
//!
//! This module contains the shared vocabulary every backend speaks.

mod message;
mod options;
mod result;
mod provider;
mod frame;
mod cancellation;
mod request;

pub use message::{last_user_content, Message, MessageRole};
pub use options::GenerationOptions;
pub use result::{GenerationResult, Usage};
pub use provider::{ProviderConfig, ProviderKind, ProviderMetadata, UnknownProvider};
pub use frame::{SourceRef, StreamFrame, DATA_PREFIX, DONE_SENTINEL};
pub use cancellation::CancellationToken;
pub use request::{ChatRequest, EmbedRequest, EmbedResponse, ErrorBody};
