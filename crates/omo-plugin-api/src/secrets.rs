//! Secrets contract consumed by plugins

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// A credential as plugins see it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEntry {
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub notes: String,
    #[serde(default)]
    pub custom_attributes: HashMap<String, String>,
}

impl SecretEntry {
    /// Look up a custom attribute (e.g. `access_key_id`)
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.custom_attributes.get(key).map(String::as_str)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("{0}")]
    InvalidPath(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

impl SecretError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SecretError::NotFound(_))
    }
}

/// Secrets addressed as `plugin/environment/entry`
pub trait SecretsProvider: Send + Sync {
    fn get(&self, path: &str) -> Result<SecretEntry, SecretError>;

    /// Create or replace the entry at `path`. Durable once it returns `Ok`.
    fn put(&self, path: &str, entry: &SecretEntry) -> Result<(), SecretError>;

    fn delete(&self, path: &str) -> Result<(), SecretError>;

    /// Every stored path starting with `prefix` (empty prefix lists all)
    fn list(&self, prefix: &str) -> Result<Vec<String>, SecretError>;

    /// Discard in-memory state and re-read the store
    fn reload(&self) -> Result<(), SecretError>;

    fn close(&self) -> Result<(), SecretError>;
}

/// Resolve a credential, treating any failure as "not configured".
///
/// A missing secret for one plugin must not take the host down, so this
/// logs and returns `None` instead of propagating.
pub fn lookup_or_skip(provider: &dyn SecretsProvider, path: &str) -> Option<SecretEntry> {
    match provider.get(path) {
        Ok(entry) => Some(entry),
        Err(e) if e.is_not_found() => {
            debug!("No credential configured at {}: {}", path, e);
            None
        }
        Err(e) => {
            warn!("Failed to resolve credential {}: {}", path, e);
            None
        }
    }
}
