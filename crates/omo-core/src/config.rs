//! Configuration management for OhMyOps

use crate::paths::{expand_home, Paths};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global OhMyOps configuration (~/.omo/config.json)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Secrets store locations
    #[serde(default)]
    pub secrets: SecretsConfig,

    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

/// Overrides for the secrets database and key file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SecretsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            secrets: SecretsConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load config from file, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        Ok(())
    }

    /// Secrets database location, honoring any override
    pub fn database_path(&self, paths: &Paths) -> PathBuf {
        self.secrets
            .database
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| paths.database())
    }

    /// Key file location, honoring any override
    pub fn key_file_path(&self, paths: &Paths) -> PathBuf {
        self.secrets
            .key_file
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| paths.key_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = Config::load(&tmp.path().join("config.json"))?;
        assert_eq!(config, Config::default());
        assert_eq!(config.log_filter, "warn");
        Ok(())
    }

    #[test]
    fn test_save_load() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("nested/config.json");

        let mut config = Config::default();
        config.secrets.database = Some(PathBuf::from("/srv/omo/omo.kdbx"));
        config.log_filter = "omo_secrets=debug".to_string();
        config.save(&path)?;

        assert_eq!(Config::load(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"secrets": {"key_file": "/etc/omo.key"}}"#)?;

        let config = Config::load(&path)?;
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.secrets.key_file, Some(PathBuf::from("/etc/omo.key")));
        assert_eq!(config.secrets.database, None);
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_an_error() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json")?;
        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_path_overrides() {
        let paths = Paths::from_root("/tmp/omo");
        let mut config = Config::default();
        assert_eq!(config.database_path(&paths), paths.database());
        assert_eq!(config.key_file_path(&paths), paths.key_file());

        config.secrets.key_file = Some(PathBuf::from("/opt/keys/omo.key"));
        assert_eq!(
            config.key_file_path(&paths),
            PathBuf::from("/opt/keys/omo.key")
        );
    }
}
