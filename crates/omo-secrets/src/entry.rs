//! Conversion between [`SecretEntry`] and stored KDBX entries
//!
//! Five field keys are standard; every other key is a custom attribute.
//! `Password` and all custom attributes are protected. Protected values live
//! in `SecStr` buffers (zeroed on drop) and the database layer encrypts them
//! with the inner stream cipher only while writing the file, so the
//! in-memory document is always in its plaintext state.

use keepass::db::{Entry, Times, Value};
use secstr::SecStr;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TITLE: &str = "Title";
pub const USERNAME: &str = "UserName";
pub const PASSWORD: &str = "Password";
pub const URL: &str = "URL";
pub const NOTES: &str = "Notes";

pub const STANDARD_FIELDS: [&str; 5] = [TITLE, USERNAME, PASSWORD, URL, NOTES];

/// One secret, identified by its path and title rather than a stored ID
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
    /// Standard field or custom attribute by its stored key
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            TITLE => Some(&self.title),
            USERNAME => Some(&self.username),
            PASSWORD => Some(&self.password),
            URL => Some(&self.url),
            NOTES => Some(&self.notes),
            _ => self.custom_attributes.get(key).map(String::as_str),
        }
    }
}

/// Whether a field is held encrypted in memory and on disk
pub fn is_protected(key: &str) -> bool {
    key == PASSWORD || !STANDARD_FIELDS.contains(&key)
}

fn value_for(key: &str, value: &str) -> Value {
    if is_protected(key) {
        Value::Protected(SecStr::new(value.as_bytes().to_vec()))
    } else {
        Value::Unprotected(value.to_string())
    }
}

fn plaintext(value: &Value) -> String {
    match value {
        Value::Unprotected(s) => s.clone(),
        Value::Protected(s) => String::from_utf8_lossy(s.unsecure()).into_owned(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

/// Stored entry -> plugin-facing entry
pub fn decode(entry: &Entry) -> SecretEntry {
    let mut secret = SecretEntry::default();
    for (key, value) in &entry.fields {
        let text = plaintext(value);
        match key.as_str() {
            TITLE => secret.title = text,
            USERNAME => secret.username = text,
            PASSWORD => secret.password = text,
            URL => secret.url = text,
            NOTES => secret.notes = text,
            _ => {
                secret.custom_attributes.insert(key.clone(), text);
            }
        }
    }
    secret
}

/// Overwrite every field of `entry`, keeping its UUID and creation time.
///
/// Custom attributes not present in `secret` are dropped.
pub fn apply(entry: &mut Entry, title: &str, secret: &SecretEntry) {
    entry.fields.clear();
    entry.times.set_last_modification(Times::now());

    let standard = [
        (TITLE, title),
        (USERNAME, secret.username.as_str()),
        (PASSWORD, secret.password.as_str()),
        (URL, secret.url.as_str()),
        (NOTES, secret.notes.as_str()),
    ];
    for (key, value) in standard {
        entry.fields.insert(key.to_string(), value_for(key, value));
    }

    for (key, value) in &secret.custom_attributes {
        if STANDARD_FIELDS.contains(&key.as_str()) {
            continue;
        }
        entry.fields.insert(key.clone(), value_for(key, value));
    }
}

/// Plugin-facing entry -> new stored entry titled `title`
pub fn encode(title: &str, secret: &SecretEntry) -> Entry {
    let mut entry = Entry::new();
    apply(&mut entry, title, secret);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn aws() -> SecretEntry {
        SecretEntry {
            title: "ignored".to_string(),
            username: "deploy".to_string(),
            password: "secret123".to_string(),
            url: "https://s3.eu-west-1.amazonaws.com".to_string(),
            notes: "ci user".to_string(),
            custom_attributes: HashMap::from([
                ("api_key".to_string(), "abc".to_string()),
                ("region".to_string(), "eu-west-1".to_string()),
            ]),
        }
    }

    #[test]
    fn test_protection_flags() {
        let entry = encode("backup", &aws());

        for key in [TITLE, USERNAME, URL, NOTES] {
            assert!(
                matches!(entry.fields.get(key), Some(Value::Unprotected(_))),
                "{} should be plain",
                key
            );
        }
        for key in [PASSWORD, "api_key", "region"] {
            assert!(
                matches!(entry.fields.get(key), Some(Value::Protected(_))),
                "{} should be protected",
                key
            );
        }
    }

    #[test]
    fn test_title_comes_from_path() {
        let decoded = decode(&encode("backup", &aws()));
        assert_eq!(decoded.title, "backup");
        assert_eq!(decoded.password, "secret123");
        assert_eq!(decoded.custom_attributes, aws().custom_attributes);
        assert_eq!(decoded.url, aws().url);
    }

    #[test]
    fn test_empty_standard_fields_are_stored() {
        let entry = encode("empty", &SecretEntry::default());
        for key in STANDARD_FIELDS {
            assert!(entry.fields.contains_key(key), "{} missing", key);
        }
        assert_eq!(entry.fields.len(), 5);
    }

    #[test]
    fn test_attribute_cannot_shadow_standard_field() {
        let mut secret = aws();
        secret
            .custom_attributes
            .insert(PASSWORD.to_string(), "shadow".to_string());

        let decoded = decode(&encode("x", &secret));
        assert_eq!(decoded.password, "secret123");
        assert!(!decoded.custom_attributes.contains_key(PASSWORD));
    }

    #[test]
    fn test_apply_keeps_uuid_and_drops_stale_attributes() {
        let mut entry = encode("backup", &aws());
        let uuid = entry.uuid;

        let mut updated = aws();
        updated.custom_attributes.remove("region");
        updated.password = "rotated".to_string();
        apply(&mut entry, "backup", &updated);

        assert_eq!(entry.uuid, uuid);
        let decoded = decode(&entry);
        assert_eq!(decoded.password, "rotated");
        assert!(!decoded.custom_attributes.contains_key("region"));
    }

    #[test]
    fn test_apply_touches_modification_time() {
        let mut entry = encode("backup", &aws());
        let old = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        entry.times.set_last_modification(old);

        apply(&mut entry, "backup", &aws());

        let modified = *entry.times.get_last_modification().unwrap();
        assert!(modified > old);
    }

    #[test]
    fn test_decode_unknown_keys_verbatim() {
        let mut entry = Entry::new();
        entry.fields.insert(
            "otp".to_string(),
            Value::Unprotected("otpauth://totp/x".to_string()),
        );
        entry.fields.insert(
            TITLE.to_string(),
            Value::Unprotected("from-keepassxc".to_string()),
        );

        let decoded = decode(&entry);
        assert_eq!(decoded.title, "from-keepassxc");
        assert_eq!(decoded.field("otp"), Some("otpauth://totp/x"));
        assert_eq!(decoded.username, "");
    }

    #[test]
    fn test_field_lookup() {
        let secret = aws();
        assert_eq!(secret.field(PASSWORD), Some("secret123"));
        assert_eq!(secret.field("region"), Some("eu-west-1"));
        assert_eq!(secret.field("missing"), None);
    }
}
