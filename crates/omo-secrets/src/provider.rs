//! KeePass-backed secrets provider
//!
//! One decrypted document in memory, guarded by a single mutex. Every
//! mutation is flushed before the call returns.
//!
//! There is no cross-process locking: two processes writing the same
//! database overwrite each other's changes (last writer wins).

use crate::entry::{self, SecretEntry};
use crate::error::{Result, SecretsError};
use crate::keyfile;
use crate::path::SecretPath;
use crate::tree;
use keepass::db::Node;
use keepass::{Database, DatabaseKey};
use omo_core::{Config, Paths};
use std::fs::{self, DirBuilder, File, Permissions};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

struct State {
    db: Database,
    /// Set by put/delete, cleared by a successful flush
    dirty: bool,
    closed: bool,
}

pub struct KeePassProvider {
    db_path: PathBuf,
    key_path: PathBuf,
    key: Zeroizing<Vec<u8>>,
    state: Mutex<State>,
}

impl KeePassProvider {
    /// Open (bootstrapping if needed) the store at the default location
    pub fn new() -> Result<Self> {
        let paths = Paths::new()?;
        Self::with_paths(paths.database(), paths.key_file())
    }

    /// Open the store at the locations named by `config`
    pub fn from_config(config: &Config, paths: &Paths) -> Result<Self> {
        Self::with_paths(config.database_path(paths), config.key_file_path(paths))
    }

    /// Open the store, creating the key file and an empty database if absent
    pub fn with_paths(db_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let key_path = key_path.into();

        for dir in [db_path.parent(), key_path.parent()]
            .into_iter()
            .flatten()
            .filter(|d| !d.as_os_str().is_empty())
        {
            create_private_dir(dir)?;
        }

        if !key_path.exists() {
            if db_path.exists() {
                warn!(
                    "Key file {} is missing but database {} exists; it will not open with a new key",
                    key_path.display(),
                    db_path.display()
                );
            }
            keyfile::generate(&key_path)?;
        }
        keyfile::verify(&key_path)?;
        let key = keyfile::read(&key_path)?;

        if !db_path.exists() {
            write_document(&db_path, &tree::new_document(), &key).map_err(|reason| {
                SecretsError::CreateDatabase {
                    path: db_path.clone(),
                    reason,
                }
            })?;
            info!("Created secrets database {}", db_path.display());
        }

        let db = open_document(&db_path, &key)?;
        debug!("Opened secrets database {}", db_path.display());

        Ok(Self {
            db_path,
            key_path,
            key,
            state: Mutex::new(State {
                db,
                dirty: false,
                closed: false,
            }),
        })
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    pub fn key_file_path(&self) -> &Path {
        &self.key_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(SecretsError::Closed);
        }
        Ok(state)
    }

    /// Retrieve the entry at `plugin/environment/entry`
    pub fn get(&self, path: &str) -> Result<SecretEntry> {
        let path = SecretPath::parse(path)?;
        let state = self.lock()?;

        let group = tree::find_group(&state.db.root, path.groups())?;
        let found = tree::entries(group)
            .find(|e| e.get_title() == Some(path.entry.as_str()))
            .ok_or_else(|| entry_not_found(&path))?;

        debug!("Resolved secret {}", path);
        Ok(entry::decode(found))
    }

    /// Store `secret` at `path`, replacing an entry with the same title
    pub fn put(&self, path: &str, secret: &SecretEntry) -> Result<()> {
        let path = SecretPath::parse(path)?;
        let mut state = self.lock()?;

        let group = tree::ensure_groups(&mut state.db.root, path.groups());
        match tree::entry_index(group, &path.entry) {
            Some(index) => {
                if let Node::Entry(existing) = &mut group.children[index] {
                    entry::apply(existing, &path.entry, secret);
                }
                debug!("Replaced secret {}", path);
            }
            None => {
                group
                    .children
                    .push(Node::Entry(entry::encode(&path.entry, secret)));
                debug!("Added secret {}", path);
            }
        }

        state.dirty = true;
        self.flush(&mut state)
    }

    /// Remove the entry at `path`
    pub fn delete(&self, path: &str) -> Result<()> {
        let path = SecretPath::parse(path)?;
        let mut state = self.lock()?;

        let group = tree::find_group_mut(&mut state.db.root, path.groups())?;
        let index = tree::entry_index(group, &path.entry).ok_or_else(|| entry_not_found(&path))?;
        group.children.remove(index);
        debug!("Deleted secret {}", path);

        state.dirty = true;
        self.flush(&mut state)
    }

    /// All stored paths starting with `prefix`, sorted
    pub fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let state = self.lock()?;
        let mut paths: Vec<String> = tree::paths(&state.db.root)
            .into_iter()
            .filter(|p| p.starts_with(prefix))
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Whether an entry exists at `path`
    pub fn exists(&self, path: &str) -> Result<bool> {
        match self.get(path) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Re-read the database from disk, discarding in-memory state
    pub fn reload(&self) -> Result<()> {
        let mut state = self.lock()?;
        let db = open_document(&self.db_path, &self.key)?;
        if state.dirty {
            warn!(
                "Discarding unflushed changes to {} on reload",
                self.db_path.display()
            );
        }
        state.db = db;
        state.dirty = false;
        debug!("Reloaded secrets database {}", self.db_path.display());
        Ok(())
    }

    /// Flush pending changes and drop the decrypted document.
    ///
    /// A failed flush leaves the provider open so close can be retried.
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Ok(());
        }
        if state.dirty {
            self.flush(&mut state)?;
        }
        // Release the decrypted tree
        state.db = tree::new_document();
        state.closed = true;
        debug!("Closed secrets database {}", self.db_path.display());
        Ok(())
    }

    fn flush(&self, state: &mut State) -> Result<()> {
        flush(&self.db_path, &self.key, state)
    }
}

impl Drop for KeePassProvider {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.closed || !state.dirty {
            return;
        }
        if let Err(e) = flush(&self.db_path, &self.key, state) {
            warn!("Unflushed secrets lost on drop: {}", e);
        }
    }
}

fn flush(db_path: &Path, key: &[u8], state: &mut State) -> Result<()> {
    write_document(db_path, &state.db, key).map_err(|reason| {
        warn!("Flush of {} failed: {}", db_path.display(), reason);
        SecretsError::Flush {
            path: db_path.to_path_buf(),
            reason,
        }
    })?;
    state.dirty = false;
    Ok(())
}

fn entry_not_found(path: &SecretPath) -> SecretsError {
    SecretsError::EntryNotFound {
        title: path.entry.clone(),
        plugin: path.plugin.clone(),
        environment: path.environment.clone(),
    }
}

fn create_private_dir(dir: &Path) -> Result<()> {
    let err = |source| SecretsError::CreateDir {
        path: dir.to_path_buf(),
        source,
    };
    if dir.exists() {
        return Ok(());
    }
    DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .map_err(err)?;
    fs::set_permissions(dir, Permissions::from_mode(0o700)).map_err(err)
}

fn database_key(key: &[u8]) -> std::io::Result<DatabaseKey> {
    let mut source = key;
    DatabaseKey::new().with_keyfile(&mut source)
}

fn open_document(path: &Path, key: &[u8]) -> Result<Database> {
    let err = |reason: String| SecretsError::OpenDatabase {
        path: path.to_path_buf(),
        reason,
    };
    let mut file = File::open(path).map_err(|e| err(e.to_string()))?;
    let db_key = database_key(key).map_err(|e| err(format!("key file: {}", e)))?;
    Database::open(&mut file, db_key).map_err(|e| err(e.to_string()))
}

/// Serialize into a sibling temp file, then rename it over `path`
fn write_document(path: &Path, db: &Database, key: &[u8]) -> std::result::Result<(), String> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::Builder::new()
        .prefix(".omo-")
        .suffix(".kdbx.tmp")
        .tempfile_in(dir)
        .map_err(|e| format!("create temp file: {}", e))?;
    tmp.as_file()
        .set_permissions(Permissions::from_mode(0o600))
        .map_err(|e| e.to_string())?;

    let db_key = database_key(key).map_err(|e| format!("key file: {}", e))?;
    db.save(&mut tmp, db_key).map_err(|e| format!("encode: {}", e))?;
    tmp.as_file().sync_all().map_err(|e| e.to_string())?;

    tmp.persist(path).map_err(|e| format!("rename: {}", e.error))?;
    Ok(())
}
