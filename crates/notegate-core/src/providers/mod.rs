//! LLM backend adapters
//!
//! ## Architecture
//!
//! Three adapters speak three wire protocols behind one [`Provider`] contract:
//! - `OpenAiProvider`: chat completions, SSE token deltas
//! - `AnthropicProvider`: messages API, SSE typed events; embeddings delegated
//! - `LocalProvider`: Ollama-compatible, NDJSON streaming
//!
//! [`Backend`] closes the set; the factory maps configuration onto it. Each
//! adapter owns a body decoder fed by the shared `decode_stream` loop.
//!
//! The `MockProvider` is kept for testing purposes.

mod traits;
mod error;
mod body;
mod openai;
mod anthropic;
mod local;
mod backend;
mod factory;
mod mock;

// Core traits and types
pub use traits::{Provider, TextStream};
pub use error::{ErrorKind, ProviderError, ProviderResult};

// Adapters
pub use openai::OpenAiProvider;
pub use anthropic::{AnthropicProvider, ANTHROPIC_VERSION, DEFAULT_MAX_TOKENS};
pub use local::LocalProvider;
pub use backend::Backend;

pub use factory::{
    create_backend, create_backend_from_settings, create_embedding_backend_from_settings,
    provider_config_from_settings, supported_providers,
};

// Mock provider for testing
pub use mock::{MockMode, MockProvider};
