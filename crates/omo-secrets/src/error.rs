//! Errors raised by the secrets store

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("secrets: {0}")]
    Paths(#[from] omo_core::PathsError),

    #[error("secrets: create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secrets: generate key file {path:?}: {reason}")]
    GenerateKeyFile { path: PathBuf, reason: String },

    #[error("secrets: read key file {path:?}: {source}")]
    ReadKeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secrets: invalid key file {path:?}: {reason}")]
    InvalidKeyFile { path: PathBuf, reason: String },

    #[error("secrets: create database {path:?}: {reason}")]
    CreateDatabase { path: PathBuf, reason: String },

    #[error("secrets: open database {path:?}: {reason}")]
    OpenDatabase { path: PathBuf, reason: String },

    #[error("secrets: invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("secrets: {segment} group {name:?} not found")]
    GroupNotFound { segment: &'static str, name: String },

    #[error("secrets: entry {title:?} not found in {plugin}/{environment}")]
    EntryNotFound {
        title: String,
        plugin: String,
        environment: String,
    },

    #[error("secrets: flush {path:?}: {reason}")]
    Flush { path: PathBuf, reason: String },

    #[error("secrets: provider is closed")]
    Closed,
}

impl SecretsError {
    /// Missing plugin group, environment group, or entry
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SecretsError::GroupNotFound { .. } | SecretsError::EntryNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SecretsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = SecretsError::EntryNotFound {
            title: "x".to_string(),
            plugin: "a".to_string(),
            environment: "b".to_string(),
        };
        assert_eq!(err.to_string(), r#"secrets: entry "x" not found in a/b"#);
        assert!(err.is_not_found());

        let err = SecretsError::GroupNotFound {
            segment: "environment",
            name: "prod".to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"secrets: environment group "prod" not found"#
        );
        assert!(err.is_not_found());

        assert!(!SecretsError::Closed.is_not_found());
    }
}
