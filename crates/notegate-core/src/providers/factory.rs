//! Backend selection from caller-supplied or persisted configuration
//!
//! Every function here is pure apart from reading the secret store: no network
//! call happens until the returned backend is used.

use std::sync::Arc;

use crate::config::AiSettings;
use crate::logging::Logger;
use crate::secrets::SecretStore;
use crate::types::{ProviderConfig, ProviderKind, ProviderMetadata};
use super::anthropic::AnthropicProvider;
use super::backend::Backend;
use super::error::{ProviderError, ProviderResult};
use super::local::LocalProvider;
use super::openai::OpenAiProvider;

/// Build the backend `config` describes.
///
/// Missing credentials for cloud kinds fail here, before any request is made.
pub fn create_backend(config: &ProviderConfig, logger: Arc<dyn Logger>) -> ProviderResult<Backend> {
    logger.debug(&format!(
        "creating {} backend at {}",
        config.kind,
        config.base_url_or_default()
    ));
    let backend = match config.kind {
        ProviderKind::OpenAi => Backend::OpenAi(OpenAiProvider::from_config(config, logger)?),
        ProviderKind::Anthropic => Backend::Anthropic(AnthropicProvider::from_config(config, logger)?),
        ProviderKind::Local => Backend::Local(LocalProvider::from_config(config, logger)?),
    };
    Ok(backend)
}

/// Resolve the provider configuration persisted settings describe.
///
/// The selected provider's credential comes from `secrets`. For Anthropic the
/// OpenAI credential, when stored, becomes the embedding credential.
pub fn provider_config_from_settings(
    settings: &AiSettings,
    secrets: &dyn SecretStore,
) -> ProviderResult<ProviderConfig> {
    let kind = settings.provider;
    let mut config = ProviderConfig::new(kind);

    if kind.requires_credential() {
        let credential = secrets
            .credential_for(kind)
            .ok_or(ProviderError::NoProviderConfigured { provider: kind })?;
        config = config.with_credential(credential);
    }
    if let Some(base_url) = settings.base_url() {
        config = config.with_base_url(base_url);
    }
    if kind == ProviderKind::Anthropic {
        if let Some(embedding) = secrets.credential_for(ProviderKind::OpenAi) {
            config = config.with_embedding_credential(embedding);
        }
    }
    Ok(config)
}

/// Build the chat backend selected by persisted settings
pub fn create_backend_from_settings(
    settings: &AiSettings,
    secrets: &dyn SecretStore,
    logger: Arc<dyn Logger>,
) -> ProviderResult<Backend> {
    let config = provider_config_from_settings(settings, secrets)?;
    create_backend(&config, logger)
}

/// Build a backend able to serve `embed` for the provider selected in settings.
///
/// Anthropic has no embedding endpoint and needs the stored OpenAI credential.
/// When the Anthropic credential itself is also missing this reports the
/// selection as unconfigured.
pub fn create_embedding_backend_from_settings(
    settings: &AiSettings,
    secrets: &dyn SecretStore,
    logger: Arc<dyn Logger>,
) -> ProviderResult<Backend> {
    if settings.provider != ProviderKind::Anthropic {
        return create_backend_from_settings(settings, secrets, logger);
    }

    let anthropic = secrets.credential_for(ProviderKind::Anthropic);
    let openai = secrets.credential_for(ProviderKind::OpenAi);
    match (anthropic, openai) {
        (Some(_), Some(_)) => create_backend_from_settings(settings, secrets, logger),
        (None, Some(openai)) => {
            logger.debug("anthropic credential missing, embedding through openai directly");
            let config = ProviderConfig::new(ProviderKind::OpenAi).with_credential(openai);
            create_backend(&config, logger)
        }
        (Some(_), None) => Err(ProviderError::EmbeddingCredentialRequired),
        (None, None) => Err(ProviderError::NoProviderConfigured {
            provider: ProviderKind::Anthropic,
        }),
    }
}

/// Static metadata for every supported backend
pub fn supported_providers() -> Vec<ProviderMetadata> {
    ProviderKind::ALL
        .iter()
        .copied()
        .map(ProviderMetadata::from)
        .collect()
}
