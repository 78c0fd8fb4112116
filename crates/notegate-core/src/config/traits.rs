//! Settings provider trait

use async_trait::async_trait;

use super::settings::AiSettings;

/// Source of the persisted gateway settings
///
/// Implementations:
/// - `MemorySettingsProvider`: In-memory for testing
/// - `FileSettingsProvider`: Reads from YAML file (~/.config/notegate/settings.yaml)
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Current settings; a missing source yields the defaults
    async fn get_settings(&self) -> ConfigResult<AiSettings>;

    /// Replace the stored settings
    async fn update_settings(&self, settings: AiSettings) -> ConfigResult<()>;
}

/// Errors that can occur during settings operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
