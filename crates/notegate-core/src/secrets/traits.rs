//! Core trait and error type for credential storage

use thiserror::Error;

use crate::types::ProviderKind;

/// Errors that can occur during secret store operations
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Store error: {0}")]
    Other(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Trait for credential storage implementations
///
/// Stores are read once per request; implementations must be cheap to query
/// and safe to share across tasks.
///
/// # Example
///
/// ```
/// use notegate_core::secrets::{SecretStore, MemorySecretStore};
/// use notegate_core::types::ProviderKind;
///
/// let store = MemorySecretStore::new();
/// store.store("openai", "sk-test").unwrap();
/// assert_eq!(store.credential_for(ProviderKind::OpenAi), Some("sk-test".to_string()));
/// ```
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Retrieve a secret by key
    fn get(&self, key: &str) -> Option<String>;

    /// Store a secret
    ///
    /// Returns `Err(SecretStoreError::ReadOnly)` if the store doesn't support writing.
    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()>;

    /// Delete a secret
    fn delete(&self, key: &str) -> SecretStoreResult<()>;

    /// Check if a secret exists
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Non-blank credential stored for `kind`. Always `None` for kinds that
    /// need no credential.
    fn credential_for(&self, kind: ProviderKind) -> Option<String> {
        if !kind.requires_credential() {
            return None;
        }
        self.get(kind.secret_key())
            .filter(|value| !value.trim().is_empty())
    }
}
