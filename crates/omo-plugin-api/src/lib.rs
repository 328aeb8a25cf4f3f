//! omo-plugin-api - What an OhMyOps plugin may depend on
//!
//! Plugins resolve credentials (SSH keys, AWS access keys, GitHub tokens,
//! Kubernetes bearer tokens) through [`SecretsProvider`]. Nothing in this
//! crate knows how or where secrets are stored.

pub mod registry;
pub mod secrets;

pub use registry::{secrets_provider, set_secrets_provider, try_secrets_provider, AlreadyRegistered};
pub use secrets::{lookup_or_skip, SecretEntry, SecretError, SecretsProvider};

use std::sync::Arc;

/// Handed to every plugin when it is initialized
#[derive(Clone)]
pub struct PluginContext {
    pub secrets: Arc<dyn SecretsProvider>,
}

impl PluginContext {
    pub fn new(secrets: Arc<dyn SecretsProvider>) -> Self {
        Self { secrets }
    }

    /// Context backed by the globally registered provider.
    ///
    /// Panics if the host has not registered one yet.
    pub fn from_registry() -> Self {
        Self::new(secrets_provider())
    }
}
