//! The provider behind the plugin-facing [`SecretsProvider`] contract
//!
//! Entries are copied field by field in both directions; plugins never hold
//! a reference into provider state.

use crate::entry::SecretEntry;
use crate::error::SecretsError;
use crate::provider::KeePassProvider;
use omo_plugin_api::{registry, AlreadyRegistered, SecretError, SecretsProvider};
use std::sync::Arc;

#[derive(Clone)]
pub struct PluginSecrets {
    inner: Arc<KeePassProvider>,
}

impl PluginSecrets {
    pub fn new(inner: Arc<KeePassProvider>) -> Self {
        Self { inner }
    }

    pub fn provider(&self) -> &KeePassProvider {
        &self.inner
    }
}

impl From<&SecretEntry> for omo_plugin_api::SecretEntry {
    fn from(e: &SecretEntry) -> Self {
        Self {
            title: e.title.clone(),
            username: e.username.clone(),
            password: e.password.clone(),
            url: e.url.clone(),
            notes: e.notes.clone(),
            custom_attributes: e.custom_attributes.clone(),
        }
    }
}

impl From<&omo_plugin_api::SecretEntry> for SecretEntry {
    fn from(e: &omo_plugin_api::SecretEntry) -> Self {
        Self {
            title: e.title.clone(),
            username: e.username.clone(),
            password: e.password.clone(),
            url: e.url.clone(),
            notes: e.notes.clone(),
            custom_attributes: e.custom_attributes.clone(),
        }
    }
}

impl From<SecretsError> for SecretError {
    fn from(e: SecretsError) -> Self {
        match e {
            SecretsError::InvalidPath { .. } => SecretError::InvalidPath(e.to_string()),
            SecretsError::GroupNotFound { .. } | SecretsError::EntryNotFound { .. } => {
                SecretError::NotFound(e.to_string())
            }
            _ => SecretError::Backend(e.to_string()),
        }
    }
}

impl SecretsProvider for PluginSecrets {
    fn get(&self, path: &str) -> Result<omo_plugin_api::SecretEntry, SecretError> {
        let entry = self.inner.get(path)?;
        Ok((&entry).into())
    }

    fn put(&self, path: &str, entry: &omo_plugin_api::SecretEntry) -> Result<(), SecretError> {
        let entry = SecretEntry::from(entry);
        Ok(self.inner.put(path, &entry)?)
    }

    fn delete(&self, path: &str) -> Result<(), SecretError> {
        Ok(self.inner.delete(path)?)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, SecretError> {
        Ok(self.inner.list(prefix)?)
    }

    fn reload(&self) -> Result<(), SecretError> {
        Ok(self.inner.reload()?)
    }

    fn close(&self) -> Result<(), SecretError> {
        Ok(self.inner.close()?)
    }
}

/// Register `provider` as the process-wide secrets provider.
///
/// Called once by the host at startup.
pub fn install(provider: Arc<KeePassProvider>) -> Result<Arc<dyn SecretsProvider>, AlreadyRegistered> {
    let shared: Arc<dyn SecretsProvider> = Arc::new(PluginSecrets::new(provider));
    registry::set_secrets_provider(Arc::clone(&shared))?;
    Ok(shared)
}
