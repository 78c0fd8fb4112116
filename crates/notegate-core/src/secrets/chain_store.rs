//! Chained secret store with fallback behavior

use std::sync::Arc;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Tries each store in order on reads; writes go to the first store.
///
/// The usual chain is settings-supplied credentials first, then the environment.
///
/// ```
/// use notegate_core::secrets::{SecretStore, ChainSecretStore, EnvSecretStore, MemorySecretStore};
/// use std::sync::Arc;
///
/// let chain = ChainSecretStore::new(vec![
///     Arc::new(MemorySecretStore::new()),
///     Arc::new(EnvSecretStore::new()),
/// ]);
/// chain.store("openai", "sk-test").unwrap();
/// assert_eq!(chain.source_of("openai"), Some("memory"));
/// ```
pub struct ChainSecretStore {
    stores: Vec<Arc<dyn SecretStore>>,
}

impl ChainSecretStore {
    pub fn new(stores: Vec<Arc<dyn SecretStore>>) -> Self {
        Self { stores }
    }

    /// Get the stores in this chain
    pub fn stores(&self) -> &[Arc<dyn SecretStore>] {
        &self.stores
    }

    /// Name of the first store holding `key`
    pub fn source_of(&self, key: &str) -> Option<&str> {
        self.stores
            .iter()
            .find(|store| store.has(key))
            .map(|store| store.name())
    }
}

impl SecretStore for ChainSecretStore {
    fn name(&self) -> &str {
        "chain"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.stores.iter().find_map(|store| store.get(key))
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        match self.stores.first() {
            Some(store) => store.store(key, value),
            None => Err(SecretStoreError::ReadOnly),
        }
    }

    /// Deletes from every store that allows it; read-only stores are skipped.
    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        for store in &self.stores {
            match store.delete(key) {
                Ok(()) | Err(SecretStoreError::ReadOnly) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
