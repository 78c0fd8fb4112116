//! Notegate Core
//!
//! Runtime-agnostic language-model gateway.
//! One request/response contract in front of three backend wire protocols,
//! plus both ends of the gateway's own SSE stream.
//!
//! ## Streaming a chat
//!
//! ```rust,ignore
//! use notegate_core::providers::{create_backend, Provider};
//! use notegate_core::stream::StreamMultiplexer;
//!
//! let backend = create_backend(&config, logger.clone())?;
//! let frames = StreamMultiplexer::new(logger)
//!     .with_sources(sources)
//!     .open(&backend, &messages, &options)
//!     .await?;
//! // each frame: frame.data() is the payload of one SSE `data:` line
//! ```
//!
//! On the receiving side, `client::StreamConsumer` reassembles the frames
//! and accumulates the text.

pub mod types;
pub mod codec;
pub mod secrets;
pub mod logging;
pub mod config;
pub mod providers;
pub mod retrieval;
pub mod stream;
pub mod client;

// Re-export commonly used types
pub use types::{
    CancellationToken, ChatRequest, EmbedRequest, EmbedResponse, ErrorBody, GenerationOptions,
    GenerationResult, Message, MessageRole, ProviderConfig, ProviderKind, ProviderMetadata,
    SourceRef, StreamFrame, Usage,
};

pub use secrets::{
    ChainSecretStore, EnvSecretStore, MemorySecretStore, SecretStore, SecretStoreError,
    SecretStoreResult,
};

pub use logging::{ConsoleLogger, Logger, NoOpLogger};

pub use config::{AiSettings, FileSettingsProvider, MemorySettingsProvider, SettingsProvider};

pub use providers::{Backend, Provider, ProviderError, ProviderResult, TextStream};

pub use retrieval::{ContextPage, ContextRetriever, StaticRetriever};

pub use stream::StreamMultiplexer;

pub use client::{ConsumeOutcome, ConsumeStatus, GatewayClient, RequestSlot, StreamConsumer};
