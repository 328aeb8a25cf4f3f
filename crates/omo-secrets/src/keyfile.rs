//! XML key file (KeePass key file format 2.0)
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <KeyFile>
//!   <Meta><Version>2.0</Version></Meta>
//!   <Key><Data Hash="XXXXXXXX">HEXBYTES</Data></Key>
//! </KeyFile>
//! ```
//!
//! `Hash` is the uppercase hex of the first 4 bytes of SHA-256(key).

use crate::error::{Result, SecretsError};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::info;
use zeroize::Zeroizing;

pub const KEY_LEN: usize = 32;
pub const VERSION: &str = "2.0";

/// Uppercase hex of the first 4 bytes of SHA-256(key)
pub fn hash_prefix(key: &[u8]) -> String {
    let digest = Sha256::digest(key);
    hex::encode_upper(&digest[..4])
}

/// Render a raw key in the XML schema
pub fn render(key: &[u8]) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n",
            "<KeyFile>\n",
            "  <Meta><Version>{}</Version></Meta>\n",
            "  <Key><Data Hash=\"{}\">{}</Data></Key>\n",
            "</KeyFile>\n",
        ),
        VERSION,
        hash_prefix(key),
        hex::encode_upper(key)
    )
}

/// Generate a fresh random key and write it to `path` with mode 0600.
///
/// Refuses to overwrite an existing file.
pub fn generate(path: &Path) -> Result<()> {
    let err = |reason: String| SecretsError::GenerateKeyFile {
        path: path.to_path_buf(),
        reason,
    };

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    OsRng
        .try_fill_bytes(&mut key[..])
        .map_err(|e| err(format!("random source: {}", e)))?;

    let body = Zeroizing::new(render(&key[..]));

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| err(e.to_string()))?;
    file.write_all(body.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| err(e.to_string()))?;

    info!("Generated key file {}", path.display());
    Ok(())
}

/// Raw key file bytes, as handed to the database as its credential
pub fn read(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    fs::read(path)
        .map(Zeroizing::new)
        .map_err(|source| SecretsError::ReadKeyFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Parse a key file and check its integrity hash, returning the raw key
pub fn verify(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    let bytes = read(path)?;
    let invalid = |reason: &str| SecretsError::InvalidKeyFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let text = std::str::from_utf8(&bytes).map_err(|_| invalid("not UTF-8"))?;
    let (version, hash, data) = parse(text).map_err(|reason| invalid(&reason))?;

    if version != VERSION {
        return Err(invalid(&format!("unsupported version {}", version)));
    }

    let hex_body: Zeroizing<String> =
        Zeroizing::new(data.chars().filter(|c| !c.is_whitespace()).collect());
    let key = Zeroizing::new(hex::decode(hex_body.as_str()).map_err(|_| invalid("Data is not hex"))?);
    if key.len() != KEY_LEN {
        return Err(invalid(&format!("key is {} bytes, expected {}", key.len(), KEY_LEN)));
    }

    if !hash.eq_ignore_ascii_case(&hash_prefix(&key)) {
        return Err(invalid("hash mismatch"));
    }

    Ok(key)
}

fn child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> std::result::Result<roxmltree::Node<'a, 'input>, String> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .ok_or_else(|| format!("missing <{}>", name))
}

/// Extract (version, hash, data) from the XML document
fn parse(text: &str) -> std::result::Result<(String, String, String), String> {
    let doc = roxmltree::Document::parse(text).map_err(|e| e.to_string())?;
    let root = doc.root_element();
    if !root.has_tag_name("KeyFile") {
        return Err("root element is not KeyFile".to_string());
    }

    let version = child(child(root, "Meta")?, "Version")?
        .text()
        .unwrap_or_default()
        .trim()
        .to_string();

    let data = child(child(root, "Key")?, "Data")?;
    let hash = data
        .attribute("Hash")
        .ok_or_else(|| "missing Hash attribute".to_string())?
        .to_string();

    Ok((version, hash, data.text().unwrap_or_default().to_string()))
}
