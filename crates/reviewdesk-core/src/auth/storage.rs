//! Key/value persistence backends for the token store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use super::crypto::SealingKey;

/// Default session file name in the cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage quota exceeded writing '{0}'")]
    QuotaExceeded(String),

    #[error("Failed to write '{key}': {reason}")]
    Write { key: String, reason: String },

    #[error("Failed to read '{key}': {reason}")]
    Read { key: String, reason: String },

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// A string key/value medium, the moral equivalent of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local store. An optional byte capacity makes writes fail the way a
/// full browser storage area does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_bytes(capacity_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity_bytes: Some(capacity_bytes),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock();
        if let Some(capacity) = self.capacity_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > capacity {
                return Err(StorageError::QuotaExceeded(key.to_string()));
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// JSON map persisted to a single file, optionally sealed at rest.
///
/// Every write rewrites the whole file; the map is tiny.
pub struct FileStore {
    path: PathBuf,
    key: Option<SealingKey>,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            key: None,
            guard: Mutex::new(()),
        }
    }

    /// Store `session.json` inside the given cache directory.
    pub fn in_dir(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(SESSION_FILE))
    }

    /// Seal the file contents with a key derived from `passphrase`.
    pub fn encrypted(path: PathBuf, passphrase: &str) -> Result<Self, StorageError> {
        let key = SealingKey::from_passphrase(passphrase)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(Self {
            path,
            key: Some(key),
            guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let read_err = |reason: String| StorageError::Read {
            key: key.to_string(),
            reason,
        };
        let raw = std::fs::read(&self.path).map_err(|e| read_err(e.to_string()))?;
        let plain = match &self.key {
            Some(sealing) => sealing.open(&raw).map_err(|e| read_err(e.to_string()))?,
            None => raw,
        };
        serde_json::from_slice(&plain).map_err(|e| read_err(e.to_string()))
    }

    fn write_map(&self, key: &str, map: &HashMap<String, String>) -> Result<(), StorageError> {
        let write_err = |reason: String| StorageError::Write {
            key: key.to_string(),
            reason,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        let plain = serde_json::to_vec_pretty(map).map_err(|e| write_err(e.to_string()))?;
        let contents = match &self.key {
            Some(sealing) => sealing.seal(&plain).map_err(|e| write_err(e.to_string()))?,
            None => plain,
        };
        std::fs::write(&self.path, contents).map_err(|e| write_err(e.to_string()))?;
        debug!(path = ?self.path, "Session file written");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_map(key)?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        // An unreadable file is replaced rather than blocking new sessions
        let mut map = self.read_map(key).unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        self.write_map(key, &map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = match self.read_map(key) {
            Ok(map) => map,
            Err(_) => {
                std::fs::remove_file(&self.path).map_err(|e| StorageError::Write {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;
                return Ok(());
            }
        };
        if map.remove(key).is_none() {
            return Ok(());
        }
        if map.is_empty() {
            std::fs::remove_file(&self.path).map_err(|e| StorageError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            })
        } else {
            self.write_map(key, &map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_quota() {
        let store = MemoryStore::with_capacity_bytes(10);
        store.set("k", "12345").unwrap();
        // Overwriting the same key does not count the old value
        store.set("k", "123456789").unwrap();
        let err = store.set("other", "x").unwrap_err();
        assert_eq!(err, StorageError::QuotaExceeded("other".to_string()));
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path());
        store.set("token", "abc").unwrap();
        store.set("user", "{}").unwrap();

        let reopened = FileStore::in_dir(dir.path());
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));

        reopened.remove("token").unwrap();
        reopened.remove("user").unwrap();
        assert!(!reopened.path().exists());
    }

    #[test]
    fn test_encrypted_file_store_hides_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sealed.json");
        let store = FileStore::encrypted(path.clone(), "correct horse").unwrap();
        store.set("token", "super-secret-token").unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("super-secret-token"));
        assert_eq!(store.get("token").unwrap().as_deref(), Some("super-secret-token"));

        let wrong = FileStore::encrypted(path, "wrong horse").unwrap();
        assert!(matches!(wrong.get("token"), Err(StorageError::Read { .. })));
    }

    #[test]
    fn test_file_store_corrupt_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path());
        std::fs::write(store.path(), "not json").unwrap();
        assert!(store.get("token").is_err());
        // Writing replaces the corrupt file
        store.set("token", "abc").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));
    }
}
