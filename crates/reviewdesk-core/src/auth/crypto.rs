//! At-rest sealing for the file-backed token store.
//!
//! Layout of a sealed blob: `MAGIC | salt (16) | nonce (12) | ciphertext`.
//! The key is derived with Argon2id from the passphrase and the blob's salt.
//! The last derived key is kept, so a process pays for one derivation; new
//! blobs reuse its salt with a fresh nonce.

use std::sync::Mutex;

use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use thiserror::Error;

const MAGIC: &[u8; 4] = b"RDS1";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + SALT_LEN + NONCE_LEN;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Passphrase must not be empty")]
    EmptyPassphrase,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed - wrong passphrase or tampered file")]
    Decrypt,

    #[error("Sealed data is malformed")]
    Malformed,
}

pub struct SealingKey {
    passphrase: Vec<u8>,
    derived: Mutex<Option<([u8; SALT_LEN], Key)>>,
}

impl SealingKey {
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CryptoError> {
        if passphrase.is_empty() {
            return Err(CryptoError::EmptyPassphrase);
        }
        Ok(Self {
            passphrase: passphrase.as_bytes().to_vec(),
            derived: Mutex::new(None),
        })
    }

    fn cipher(&self, salt: &[u8; SALT_LEN]) -> Result<ChaCha20Poly1305, CryptoError> {
        let mut derived = self.derived.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((cached_salt, key)) = derived.as_ref() {
            if cached_salt == salt {
                return Ok(ChaCha20Poly1305::new(key));
            }
        }

        let mut raw = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(&self.passphrase, salt, &mut raw)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        let key = Key::clone_from_slice(&raw);
        let cipher = ChaCha20Poly1305::new(&key);
        *derived = Some((*salt, key));
        Ok(cipher)
    }

    fn current_salt(&self) -> [u8; SALT_LEN] {
        let derived = self.derived.lock().unwrap_or_else(|e| e.into_inner());
        match derived.as_ref() {
            Some((salt, _)) => *salt,
            None => {
                let mut salt = [0u8; SALT_LEN];
                rand::thread_rng().fill_bytes(&mut salt);
                salt
            }
        }
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let salt = self.current_salt();
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher(&salt)?
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::Encrypt)?;

        let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < HEADER_LEN || &sealed[..MAGIC.len()] != MAGIC {
            return Err(CryptoError::Malformed);
        }
        let salt: [u8; SALT_LEN] = sealed[MAGIC.len()..MAGIC.len() + SALT_LEN]
            .try_into()
            .map_err(|_| CryptoError::Malformed)?;
        let nonce = &sealed[MAGIC.len() + SALT_LEN..HEADER_LEN];
        self.cipher(&salt)?
            .decrypt(Nonce::from_slice(nonce), &sealed[HEADER_LEN..])
            .map_err(|_| CryptoError::Decrypt)
    }
}

impl std::fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealingKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let key = SealingKey::from_passphrase("pass").unwrap();
        let sealed = key.seal(b"hello").unwrap();
        assert_eq!(&sealed[..4], MAGIC);
        assert_eq!(key.open(&sealed).unwrap(), b"hello");
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let key = SealingKey::from_passphrase("pass").unwrap();
        let first = key.seal(b"same").unwrap();
        let second = key.seal(b"same").unwrap();
        assert_ne!(first, second);
        // Same derived key, different nonce
        assert_eq!(first[4..4 + SALT_LEN], second[4..4 + SALT_LEN]);
        assert_ne!(first[4 + SALT_LEN..HEADER_LEN], second[4 + SALT_LEN..HEADER_LEN]);
    }

    #[test]
    fn test_opens_blob_sealed_by_another_key_instance() {
        let writer = SealingKey::from_passphrase("pass").unwrap();
        let sealed = writer.seal(b"hello").unwrap();

        let reader = SealingKey::from_passphrase("pass").unwrap();
        assert_eq!(reader.open(&sealed).unwrap(), b"hello");
        // The reader adopts the file's salt for its own writes
        let resealed = reader.seal(b"again").unwrap();
        assert_eq!(resealed[4..4 + SALT_LEN], sealed[4..4 + SALT_LEN]);
        assert_eq!(writer.open(&resealed).unwrap(), b"again");
    }

    #[test]
    fn test_tampered_blob_fails() {
        let key = SealingKey::from_passphrase("pass").unwrap();
        let mut sealed = key.seal(b"hello").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;
        assert!(matches!(key.open(&sealed), Err(CryptoError::Decrypt)));
        assert!(matches!(key.open(b"RDS1"), Err(CryptoError::Malformed)));
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        assert!(matches!(
            SealingKey::from_passphrase(""),
            Err(CryptoError::EmptyPassphrase)
        ));
    }
}
