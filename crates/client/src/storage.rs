//! Local key-value state.
//!
//! The client persists a handful of string values between runs (token,
//! username, wallet balance, cached cart). The store is a cache: the core
//! reads and writes it but the backend stays authoritative.
//!
//! [`FileStore`] keeps all keys in a single JSON object and rewrites the
//! file through a synced temporary sibling, so a crash never leaves it half
//! written.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur when reading or writing local state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The state file is not a JSON object of strings.
    #[error("Corrupt state file {path}: {source}")]
    Corrupt {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// A string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

type Entries = BTreeMap<String, String>;

fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        lock(&self.entries).clear();
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// JSON-file backed store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories as needed.
    /// A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Entries::new(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Entries::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "opened state file");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all entries to disk.
    ///
    /// The JSON goes to a temporary file in the same directory, is synced,
    /// and then renamed over the state file. On Unix the file is owner-only.
    fn flush(&self, entries: &Entries) -> Result<(), StorageError> {
        let io_err = |source: io::Error| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let json = serde_json::to_vec_pretty(entries).map_err(|source| {
            StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let temp = NamedTempFile::new_in(dir).map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }

        let mut file = temp.as_file();
        file.write_all(&json).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        temp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        entries.clear();
        self.flush(&entries)
    }
}
