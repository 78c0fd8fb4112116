//! Notegate Server
//!
//! axum front end for `notegate-core`: a streaming chat endpoint, a blocking
//! completion endpoint, embeddings and provider metadata.

pub mod api;
pub mod error;
pub mod logging;
pub mod state;

pub use api::create_router;
pub use error::ApiError;
pub use logging::TracingLogger;
pub use state::AppState;
