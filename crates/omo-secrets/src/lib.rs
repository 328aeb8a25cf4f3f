//! omo-secrets - KeePass-backed secrets store for OhMyOps
//!
//! "Plugins ask for credentials by address, never by file format."
//!
//! Every plugin (Git, S3, SSH, Kubernetes) keeps its credentials in one
//! KDBX4 database, addressed as `plugin/environment/entry`. The database is
//! unlocked with a generated key file only; there is no master password.
//!
//! On disk:
//! - `~/.omo/keys/omo.key` - XML key file (0600)
//! - `~/.omo/secrets/omo.kdbx` - encrypted database (0600)

pub mod adapter;
pub mod entry;
pub mod error;
pub mod keyfile;
pub mod path;
pub mod provider;
pub mod tree;

pub use adapter::{install, PluginSecrets};
pub use error::{Result, SecretsError};
pub use entry::SecretEntry;
pub use path::SecretPath;
pub use provider::KeePassProvider;
