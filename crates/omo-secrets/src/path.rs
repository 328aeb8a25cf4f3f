//! Secret addresses: `plugin/environment/entry`

use crate::error::{Result, SecretsError};
use std::fmt;
use std::str::FromStr;

/// A validated three-segment secret address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretPath {
    pub plugin: String,
    pub environment: String,
    pub entry: String,
}

impl SecretPath {
    /// Trim surrounding slashes and split into exactly three non-empty segments
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| SecretsError::InvalidPath {
            path: input.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = input.trim_matches('/').split('/').collect();
        if parts.len() != 3 {
            return Err(invalid(&format!(
                "expected plugin/environment/entry, got {} segment(s)",
                parts.len()
            )));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("empty segment"));
        }

        Ok(Self {
            plugin: parts[0].to_string(),
            environment: parts[1].to_string(),
            entry: parts[2].to_string(),
        })
    }

    /// The (plugin, environment) group pair
    pub fn groups(&self) -> [&str; 2] {
        [&self.plugin, &self.environment]
    }
}

impl FromStr for SecretPath {
    type Err = SecretsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.plugin, self.environment, self.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let path = SecretPath::parse("a/b/c").unwrap();
        assert_eq!(path.plugin, "a");
        assert_eq!(path.environment, "b");
        assert_eq!(path.entry, "c");
        assert_eq!(path.groups(), ["a", "b"]);
    }

    #[test]
    fn test_parse_trims_slashes() {
        let path = SecretPath::parse("/ssh/prod/bastion/").unwrap();
        assert_eq!(path.to_string(), "ssh/prod/bastion");

        let path: SecretPath = "//s3/dev/backup//".parse().unwrap();
        assert_eq!(path.entry, "backup");
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["", "/", "a", "a/b", "a//c", "a/b/c/d", "a/ /c/"] {
            let result = SecretPath::parse(input);
            if input == "a/ /c/" {
                // whitespace is a legal segment; only empty ones are rejected
                assert!(result.is_ok());
                continue;
            }
            assert!(
                matches!(result, Err(SecretsError::InvalidPath { .. })),
                "{:?} should not parse",
                input
            );
        }
    }

    #[test]
    fn test_segments_keep_case() {
        let path = SecretPath::parse("Git/Prod/Token").unwrap();
        assert_eq!(path.groups(), ["Git", "Prod"]);
    }
}
