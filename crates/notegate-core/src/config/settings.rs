//! Persisted gateway settings

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::secrets::{ChainSecretStore, EnvSecretStore, MemorySecretStore, SecretStore};
use crate::types::{GenerationOptions, ProviderKind};

/// Time budget for one streamed request when none is configured
pub const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 300;

/// Which backend to use and how
///
/// `credentials` maps provider secret keys (`openai`, `anthropic`) to API keys.
/// It is optional; the environment is consulted for anything it lacks.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    pub provider: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub credentials: HashMap<String, String>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self::new(ProviderKind::OpenAi)
    }
}

impl AiSettings {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            model: None,
            base_url: None,
            embedding_model: None,
            stream_timeout_secs: None,
            credentials: HashMap::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Store a credential under `kind`'s secret key
    pub fn with_credential(mut self, kind: ProviderKind, credential: impl Into<String>) -> Self {
        self.credentials
            .insert(kind.secret_key().to_string(), credential.into());
        self
    }

    /// Base URL override, ignoring blank values
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(
            self.stream_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_STREAM_TIMEOUT_SECS),
        )
    }

    /// Fill in `model` from settings when the caller did not choose one
    pub fn chat_options(&self, options: GenerationOptions) -> GenerationOptions {
        Self::apply_model(options, self.model.as_deref())
    }

    /// Fill in the embedding model from settings when the caller did not choose one
    pub fn embedding_options(&self, options: GenerationOptions) -> GenerationOptions {
        Self::apply_model(options, self.embedding_model.as_deref())
    }

    fn apply_model(mut options: GenerationOptions, model: Option<&str>) -> GenerationOptions {
        let unset = options
            .model
            .as_deref()
            .map_or(true, |m| m.trim().is_empty());
        if unset {
            if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
                options.model = Some(model.to_string());
            }
        }
        options
    }

    /// Credentials from these settings, falling back to the environment
    pub fn secret_store(&self) -> ChainSecretStore {
        let stored: Arc<dyn SecretStore> =
            Arc::new(MemorySecretStore::with_secrets(self.credentials.clone()));
        ChainSecretStore::new(vec![stored, Arc::new(EnvSecretStore::new())])
    }
}

impl std::fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&str> = self.credentials.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("AiSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("stream_timeout_secs", &self.stream_timeout_secs)
            .field("credentials", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case() {
        let settings: AiSettings = serde_json::from_str(
            r#"{"provider":"ollama","model":"mistral","baseUrl":"http://gpu:11434","streamTimeoutSecs":60}"#,
        )
        .unwrap();
        assert_eq!(settings.provider, ProviderKind::Local);
        assert_eq!(settings.base_url(), Some("http://gpu:11434"));
        assert_eq!(settings.stream_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_stream_timeout_default() {
        let mut settings = AiSettings::default();
        assert_eq!(settings.stream_timeout(), Duration::from_secs(300));
        settings.stream_timeout_secs = Some(0);
        assert_eq!(settings.stream_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_model_applied_only_when_unset() {
        let settings = AiSettings::new(ProviderKind::OpenAi).with_model("gpt-4o");

        let filled = settings.chat_options(GenerationOptions::default());
        assert_eq!(filled.model.as_deref(), Some("gpt-4o"));

        let kept = settings.chat_options(GenerationOptions::new().with_model("o3-mini"));
        assert_eq!(kept.model.as_deref(), Some("o3-mini"));

        let embedding = settings.embedding_options(GenerationOptions::default());
        assert_eq!(embedding.model, None);
    }

    #[test]
    fn test_settings_credentials_take_precedence() {
        let settings = AiSettings::new(ProviderKind::Anthropic)
            .with_credential(ProviderKind::Anthropic, "sk-ant-settings");
        let store = settings.secret_store();
        assert_eq!(
            store.credential_for(ProviderKind::Anthropic),
            Some("sk-ant-settings".to_string())
        );
        assert_eq!(store.source_of("anthropic"), Some("memory"));
    }

    #[test]
    fn test_debug_hides_credentials() {
        let settings =
            AiSettings::new(ProviderKind::OpenAi).with_credential(ProviderKind::OpenAi, "sk-secret");
        let debug = format!("{:?}", settings);
        assert!(debug.contains("openai"));
        assert!(!debug.contains("sk-secret"));
    }
}
