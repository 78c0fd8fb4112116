//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Mapping from provider secret keys to environment variable names
static ENV_VAR_MAP: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    m.insert("openai", &["OPENAI_API_KEY"]);
    m.insert("anthropic", &["ANTHROPIC_API_KEY", "CLAUDE_API_KEY"]);
    m.insert("local", &[]);
    m
});

/// Read-only secret store backed by the process environment
///
/// Provider keys map to their conventional variables:
/// - `openai` → `OPENAI_API_KEY`
/// - `anthropic` → `ANTHROPIC_API_KEY` (or `CLAUDE_API_KEY`)
///
/// Any other key is looked up verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    /// Environment variables consulted for a provider key
    pub fn env_vars_for(key: &str) -> Option<&'static [&'static str]> {
        ENV_VAR_MAP.get(key.to_lowercase().as_str()).copied()
    }

    fn read(var: &str) -> Option<String> {
        env::var(var).ok().filter(|value| !value.is_empty())
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        match Self::env_vars_for(key) {
            Some(vars) => vars.iter().find_map(|var| Self::read(var)),
            None => Self::read(key),
        }
    }

    fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }

    fn delete(&self, _key: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }
}
