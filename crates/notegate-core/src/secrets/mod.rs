//! Credential storage abstractions and implementations
//!
//! Credentials are keyed by `ProviderKind::secret_key()` (`openai`, `anthropic`).
//! Built-in stores: `EnvSecretStore`, `MemorySecretStore`, `ChainSecretStore`.

mod traits;
mod env_store;
mod memory_store;
mod chain_store;

pub use traits::{SecretStore, SecretStoreError, SecretStoreResult};
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use chain_store::ChainSecretStore;
