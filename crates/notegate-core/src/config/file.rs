//! File-based settings provider (YAML)

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;

use super::settings::AiSettings;
use super::traits::{ConfigError, ConfigResult, SettingsProvider};

/// Reads and writes gateway settings from a YAML file, caching the parsed value.
///
/// ```no_run
/// use notegate_core::config::FileSettingsProvider;
///
/// let settings = FileSettingsProvider::user();
/// println!("{}", settings.path().display());
/// ```
pub struct FileSettingsProvider {
    path: PathBuf,
    cache: RwLock<Option<AiSettings>>,
}

impl FileSettingsProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// User-level settings (~/.config/notegate/settings.yaml)
    pub fn user() -> Self {
        Self::new(Self::default_path())
    }

    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("notegate").join("settings.yaml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ConfigResult<AiSettings> {
        if !self.path.exists() {
            return Ok(AiSettings::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(AiSettings::default());
        }
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn save(&self, settings: &AiSettings) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(settings)
            .map_err(|e| ConfigError::Other(format!("Failed to serialize YAML: {}", e)))?;
        fs::write(&self.path, content)?;

        self.set_cache(settings.clone());
        Ok(())
    }

    fn set_cache(&self, settings: AiSettings) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *cache = Some(settings);
    }

    fn cached(&self) -> Option<AiSettings> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Reload settings from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<AiSettings> {
        let settings = self.load()?;
        self.set_cache(settings.clone());
        Ok(settings)
    }

    /// Copy the current file next to itself; `None` when there is nothing to back up
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }
}

impl std::fmt::Debug for FileSettingsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSettingsProvider")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl SettingsProvider for FileSettingsProvider {
    async fn get_settings(&self) -> ConfigResult<AiSettings> {
        if let Some(settings) = self.cached() {
            return Ok(settings);
        }
        self.reload()
    }

    async fn update_settings(&self, settings: AiSettings) -> ConfigResult<()> {
        self.save(&settings)
    }
}
