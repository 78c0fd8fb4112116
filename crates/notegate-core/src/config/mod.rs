//! Gateway settings
//!
//! Supports two settings sources:
//! - `MemorySettingsProvider`: In-memory for tests and embedding
//! - `FileSettingsProvider`: YAML file (`~/.config/notegate/settings.yaml`)

mod settings;
mod traits;
mod memory;
mod file;

pub use settings::{AiSettings, DEFAULT_STREAM_TIMEOUT_SECS};
pub use traits::{SettingsProvider, ConfigError, ConfigResult};
pub use memory::MemorySettingsProvider;
pub use file::FileSettingsProvider;
