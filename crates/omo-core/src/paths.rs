//! Standard paths used by OhMyOps components

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that relocates the OhMyOps root
pub const HOME_ENV: &str = "OMO_HOME";

#[derive(Error, Debug)]
pub enum PathsError {
    #[error("could not determine the home directory")]
    NoHomeDir,
}

/// Standard OhMyOps paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Root directory (~/.omo)
    pub root: PathBuf,
    /// Key file directory (~/.omo/keys)
    pub keys: PathBuf,
    /// Secrets database directory (~/.omo/secrets)
    pub secrets: PathBuf,
    /// Installed plugin libraries (~/.omo/plugins)
    pub plugins: PathBuf,
}

impl Paths {
    /// Resolve the root from `OMO_HOME`, falling back to `<home>/.omo`
    pub fn new() -> Result<Self, PathsError> {
        if let Some(root) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::from_root(PathBuf::from(root)));
        }

        let home = dirs::home_dir().ok_or(PathsError::NoHomeDir)?;
        Ok(Self::from_root(home.join(".omo")))
    }

    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            keys: root.join("keys"),
            secrets: root.join("secrets"),
            plugins: root.join("plugins"),
            root,
        }
    }

    /// Default key file (~/.omo/keys/omo.key)
    pub fn key_file(&self) -> PathBuf {
        self.keys.join("omo.key")
    }

    /// Default secrets database (~/.omo/secrets/omo.kdbx)
    pub fn database(&self) -> PathBuf {
        self.secrets.join("omo.kdbx")
    }

    /// Global configuration file (~/.omo/config.json)
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }
}

/// Expand a leading `~/` against the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
