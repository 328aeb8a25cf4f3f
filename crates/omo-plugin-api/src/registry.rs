//! Process-wide secrets provider for late-loaded plugins
//!
//! The host registers exactly one provider at startup, before any plugin is
//! loaded. Plugins that cannot receive a [`PluginContext`](crate::PluginContext)
//! read it from here. There is no re-registration and no unregistration.

use crate::secrets::SecretsProvider;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

static PROVIDER: OnceLock<Arc<dyn SecretsProvider>> = OnceLock::new();

#[derive(Error, Debug)]
#[error("a secrets provider is already registered")]
pub struct AlreadyRegistered;

pub fn set_secrets_provider(provider: Arc<dyn SecretsProvider>) -> Result<(), AlreadyRegistered> {
    PROVIDER.set(provider).map_err(|_| AlreadyRegistered)
}

/// The registered provider.
///
/// # Panics
///
/// When called before the host registered one; that is a wiring bug.
pub fn secrets_provider() -> Arc<dyn SecretsProvider> {
    match PROVIDER.get() {
        Some(provider) => Arc::clone(provider),
        None => panic!("secrets provider accessed before set_secrets_provider was called"),
    }
}

pub fn try_secrets_provider() -> Option<Arc<dyn SecretsProvider>> {
    PROVIDER.get().cloned()
}
