//! Durable client-side storage for the session token and user
//!
//! Two fixed keys live in a small key/value store:
//! - `auth_token`: the raw bearer token
//! - `user_info`: the signed-in user, JSON-encoded
//!
//! [`FileStore`] keeps the map in a JSON file so a session survives process
//! restarts; [`MemoryStore`] is the non-persistent variant.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::protocol::User;

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "user_info";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file {path} is corrupted: {source}")]
    CorruptFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Stored user record is corrupted: {0}")]
    CorruptUser(#[source] serde_json::Error),

    #[error("Failed to encode storage entry: {0}")]
    Encode(#[source] serde_json::Error),
}

/// String key/value backend
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store, lost on drop
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// JSON-file backed store
///
/// The whole map is rewritten on every mutation. The file and its parent
/// directory are created on first write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|source| StorageError::CorruptFile {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Delete the file at `path` (if any) and open an empty store there
    pub fn reset(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::info!("Discarded session file {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries).map_err(StorageError::Encode)?;
        write_private(&self.path, content.as_bytes())?;
        Ok(())
    }

    /// Apply `change` to a copy, persist it, and only then publish it
    fn update(&self, change: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = entries.clone();
        if !change(&mut next) {
            return Ok(());
        }

        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

/// The file holds a bearer token: owner read/write only
#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::fs::{OpenOptions, Permissions};
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten files written by older builds
    file.set_permissions(Permissions::from_mode(0o600))?;
    file.write_all(bytes)
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

/// Token and user persistence on top of a [`KeyValueStore`]
///
/// No validation of the token format is performed.
pub struct TokenStore {
    backend: Box<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn open_file(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self::new(FileStore::open(path)?))
    }

    /// Start over with an empty file, for a session file that no longer parses
    pub fn reset_file(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self::new(FileStore::reset(path)?))
    }

    pub fn get(&self) -> Result<Option<String>, StorageError> {
        self.backend.get(TOKEN_KEY)
    }

    pub fn set(&self, token: &str) -> Result<(), StorageError> {
        self.backend.set(TOKEN_KEY, token)
    }

    pub fn remove(&self) -> Result<(), StorageError> {
        self.backend.remove(TOKEN_KEY)
    }

    /// Stored user, parsed. A blob that fails to parse is an error.
    pub fn get_user(&self) -> Result<Option<User>, StorageError> {
        match self.backend.get(USER_KEY)? {
            Some(raw) => serde_json::from_str::<Option<User>>(&raw).map_err(StorageError::CorruptUser),
            None => Ok(None),
        }
    }

    /// `None` is stored as JSON `null` and reads back as no user
    pub fn set_user(&self, user: Option<&User>) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&user).map_err(StorageError::Encode)?;
        self.backend.set(USER_KEY, &raw)
    }

    pub fn remove_user(&self) -> Result<(), StorageError> {
        self.backend.remove(USER_KEY)
    }

    /// Drop both token and user
    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.remove()?;
        self.remove_user()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}
