//! Authentication module for managing user sessions and their storage.
//!
//! This module provides:
//! - `TokenStore`: the persisted session (tokens, user, expiry) over a
//!   pluggable `KeyValueStore` (memory, file, sealed file or OS keychain)
//! - `SessionCoordinator`: login, refresh and logout with observable state
//! - `Access`: route-level access checks by role
//!
//! Tokens stop being attached five minutes before they expire.

pub mod backend;
pub mod coordinator;
pub mod credentials;
pub mod crypto;
pub mod guard;
pub mod session;
pub mod storage;
pub mod token_store;

use std::sync::Arc;

use anyhow::{Context, Result};

pub use backend::{AuthBackend, TokenGrant};
pub use coordinator::{SessionCoordinator, SessionProvider};
pub use credentials::KeyringStore;
pub use guard::Access;
pub use session::{AuthSnapshot, AuthState, Credentials, Session, User};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use token_store::{compute_expiry, TokenStore};

use crate::config::{Config, StorageBackend, ENV_STORAGE_PASSPHRASE};

/// Open the configured token storage backend. The sealed file backend reads
/// its passphrase from the environment.
pub fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let passphrase = std::env::var(ENV_STORAGE_PASSPHRASE).ok();
    open_store_with(config, passphrase.as_deref())
}

pub fn open_store_with(config: &Config, passphrase: Option<&str>) -> Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.storage_backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::in_dir(&config.cache_dir()?)),
        StorageBackend::EncryptedFile => {
            let passphrase = passphrase
                .with_context(|| format!("{} must be set for encrypted storage", ENV_STORAGE_PASSPHRASE))?;
            let path = FileStore::in_dir(&config.cache_dir()?).path().to_path_buf();
            Arc::new(FileStore::encrypted(path, passphrase)?)
        }
        StorageBackend::Keyring => Arc::new(KeyringStore::new()),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path, backend: StorageBackend) -> Config {
        Config {
            storage_backend: backend,
            cache_dir: Some(dir.to_path_buf()),
            ..Config::default()
        }
    }

    #[test]
    fn test_open_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store_with(&config_in(dir.path(), StorageBackend::File), None).unwrap();
        store.set("flex_auth_token", "abc").unwrap();
        assert!(dir.path().join("session.json").exists());
    }

    #[test]
    fn test_encrypted_store_needs_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), StorageBackend::EncryptedFile);
        assert!(open_store_with(&config, None).is_err());

        let store = open_store_with(&config, Some("correct horse")).unwrap();
        store.set("flex_auth_token", "abc").unwrap();
        let raw = std::fs::read(dir.path().join("session.json")).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("flex_auth_token"));
    }
}
