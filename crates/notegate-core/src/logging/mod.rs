//! Logging abstractions for runtime-agnostic logging
//!
//! The core never installs a global logger. Adapters, the factory and the
//! multiplexer receive an `Arc<dyn Logger>`; hosts decide where lines go.

mod traits;
mod noop;
mod console;

pub use traits::{Logger, LogLevel, SharedLogger};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;
