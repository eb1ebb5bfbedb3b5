//! Key/value persistence tiers.
//!
//! The token cache and the local configuration store only need three
//! operations: `get`, `set` and `remove` on string keys.  Two tiers exist:
//!
//! - [`FileStore`] – survives restarts; one file per key under a directory.
//! - [`MemoryStore`] – lives as long as the process; optionally limited by a
//!   byte quota, or constructed as permanently unavailable.
//!
//! A tier that cannot be used reports [`StorageError`] instead of panicking,
//! so callers can fall back to the next tier.
//!
//! On unix, files written by [`FileStore`] are readable by their owner only,
//! since one of them holds the save token in plain text.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

/// Errors from a key/value tier.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The tier cannot be used at all (disabled, poisoned, no directory).
    #[error("{0} storage is unavailable")]
    Unavailable(String),

    /// A file-system operation failed.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the value would exceed the tier's byte quota.
    #[error("{tier} storage quota exceeded ({needed} bytes needed, limit {limit})")]
    QuotaExceeded {
        tier: String,
        needed: usize,
        limit: usize,
    },
}

/// Minimal string key/value capability shared by every tier.
pub trait KeyValueStore: Send + Sync {
    /// Short tier name used in log messages.
    fn name(&self) -> &str;

    /// Returns `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ── FileStore ─────────────────────────────────────────────────────────────────

/// Persistent tier storing each key as a file inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(file)
    }
}

impl KeyValueStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(key);
        write_owner_only(&path, value).map_err(|source| StorageError::Io { path, source })?;
        debug!(key, dir = %self.dir.display(), "value written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

/// Truncates and writes `path` with mode `0600`, tightening the mode of a
/// file that already existed with wider permissions.
fn write_owner_only(path: &Path, value: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(value.as_bytes())
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// Process-lifetime tier.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
    available: bool,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(HashMap::new()),
            quota: None,
            available: true,
        }
    }

    /// Limits the total size of all keys and values to `bytes`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// A tier whose every operation fails with [`StorageError::Unavailable`].
    pub fn unavailable(name: impl Into<String>) -> Self {
        Self {
            available: false,
            ..Self::new(name)
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable(self.name.clone()));
        }
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable(self.name.clone()))
    }
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries()?;
        if let Some(limit) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    tier: self.name.clone(),
                    needed,
                    limit,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}
