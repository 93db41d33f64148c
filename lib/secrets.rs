//! Secret stores backing `{{SECRET.key}}` placeholders.
//!
//! Secrets are only ever resolved into HTTP executor requests. Function
//! executors have no path to a store.

use std::collections::HashMap;

use zeroize::Zeroize;

use crate::constants::SECRET_ENV_PREFIX;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Source of secret values.
pub trait SecretStore: Send + Sync {
    /// Get the secret named `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
}

/// In-memory secret store.
#[derive(Default)]
pub struct MapSecretStore {
    secrets: HashMap<String, String>,
}

/// Environment-based secret store.
///
/// `{{SECRET.api_key}}` resolves from `EXTREG_SECRET_API_KEY`.
pub struct EnvSecretStore {
    prefix: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MapSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret, returning the store.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace a secret.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let Some(mut old) = self.secrets.insert(key.into(), value.into()) {
            old.zeroize();
        }
    }
}

impl EnvSecretStore {
    /// Create a store reading `EXTREG_SECRET_*` variables.
    pub fn new() -> Self {
        Self::with_prefix(SECRET_ENV_PREFIX)
    }

    /// Create a store reading variables with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, key: &str) -> String {
        let key: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' => c.to_ascii_uppercase(),
                'A'..='Z' | '0'..='9' => c,
                _ => '_',
            })
            .collect();
        format!("{}{}", self.prefix, key)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl SecretStore for MapSecretStore {
    fn get(&self, key: &str) -> Option<String> {
        self.secrets.get(key).cloned()
    }
}

impl SecretStore for EnvSecretStore {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key)).ok()
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MapSecretStore {
    fn drop(&mut self) {
        for value in self.secrets.values_mut() {
            value.zeroize();
        }
    }
}

impl std::fmt::Debug for MapSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapSecretStore")
            .field("keys", &self.secrets.keys().collect::<Vec<_>>())
            .finish()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
