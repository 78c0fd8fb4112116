//! In-memory settings provider

use std::sync::RwLock;

use async_trait::async_trait;

use super::settings::AiSettings;
use super::traits::{ConfigResult, SettingsProvider};

/// In-memory settings provider for tests and embedding hosts
#[derive(Debug, Default)]
pub struct MemorySettingsProvider {
    settings: RwLock<AiSettings>,
}

impl MemorySettingsProvider {
    pub fn new(settings: AiSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsProvider for MemorySettingsProvider {
    async fn get_settings(&self) -> ConfigResult<AiSettings> {
        let guard = self.settings.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    async fn update_settings(&self, settings: AiSettings) -> ConfigResult<()> {
        let mut guard = self.settings.write().unwrap_or_else(|e| e.into_inner());
        *guard = settings;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderKind;

    #[tokio::test]
    async fn test_memory_settings_provider() {
        let provider = MemorySettingsProvider::default();
        assert_eq!(provider.get_settings().await.unwrap().provider, ProviderKind::OpenAi);

        provider
            .update_settings(AiSettings::new(ProviderKind::Local).with_model("llama3.1"))
            .await
            .unwrap();

        let settings = provider.get_settings().await.unwrap();
        assert_eq!(settings.provider, ProviderKind::Local);
        assert_eq!(settings.model.as_deref(), Some("llama3.1"));
    }
}
