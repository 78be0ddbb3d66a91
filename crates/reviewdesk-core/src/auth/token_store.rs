//! Durable session storage and expiry arithmetic.

use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::session::{now_millis, Session, User};
use super::storage::{KeyValueStore, StorageError};
use crate::config::StorageKeys;

const SECOND_MS: i64 = 1000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Expiry used when the server's duration string cannot be parsed.
pub const DEFAULT_EXPIRY_MS: i64 = 7 * DAY_MS;

/// Absolute expiry for a relative duration like `30m`, `2h`, `5d` or `45s`.
///
/// Anything else (unknown unit, sign, whitespace, missing digits, overflow)
/// falls back to seven days from `now_ms`.
pub fn compute_expiry(relative: &str, now_ms: i64) -> i64 {
    parse_duration_ms(relative)
        .and_then(|ms| now_ms.checked_add(ms))
        .unwrap_or_else(|| {
            debug!(expires_in = relative, "Unrecognized expiry format, defaulting to 7 days");
            now_ms.saturating_add(DEFAULT_EXPIRY_MS)
        })
}

fn parse_duration_ms(relative: &str) -> Option<i64> {
    let unit = relative.chars().last()?;
    let digits = &relative[..relative.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let unit_ms = match unit {
        's' => SECOND_MS,
        'm' => MINUTE_MS,
        'h' => HOUR_MS,
        'd' => DAY_MS,
        _ => return None,
    };
    digits.parse::<i64>().ok()?.checked_mul(unit_ms)
}

/// Owns the four persisted session entries.
///
/// The backend is read once at construction; afterwards the session is
/// answered from memory and written through on `save` and `clear`.
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    current: RwLock<Option<Session>>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, keys: StorageKeys) -> Self {
        let store = Self {
            backend,
            keys,
            current: RwLock::new(None),
        };
        store.reload();
        store
    }

    fn set_current(&self, session: Option<Session>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = session;
    }

    /// Persist all four fields. A rejected write is fatal to the caller's
    /// login flow.
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        let user = serde_json::to_string(&session.user).map_err(|e| StorageError::Write {
            key: self.keys.user.clone(),
            reason: e.to_string(),
        })?;
        self.backend.set(&self.keys.token, &session.access_token)?;
        self.backend.set(&self.keys.refresh_token, &session.refresh_token)?;
        self.backend.set(&self.keys.user, &user)?;
        self.backend
            .set(&self.keys.token_expiry, &session.expires_at.to_string())?;
        self.set_current(Some(session.clone()));
        Ok(())
    }

    /// The stored session, or `None` when absent, partial or corrupt.
    pub fn load(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Re-read the backend, replacing the in-memory session.
    pub fn reload(&self) -> Option<Session> {
        let session = self.read_session();
        self.set_current(session.clone());
        session
    }

    fn read_session(&self) -> Option<Session> {
        let access_token = self.read(&self.keys.token)?;
        let refresh_token = self.read(&self.keys.refresh_token)?;
        let user_json = self.read(&self.keys.user)?;
        let expiry = self.read(&self.keys.token_expiry)?;

        let user: User = match serde_json::from_str(&user_json) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Stored user record is corrupt, ignoring session");
                return None;
            }
        };
        let expires_at = match expiry.trim().parse::<i64>() {
            Ok(expires_at) => expires_at,
            Err(e) => {
                warn!(error = %e, "Stored token expiry is corrupt, ignoring session");
                return None;
            }
        };

        Some(Session {
            access_token,
            refresh_token,
            user,
            expires_at,
        })
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read session entry");
                None
            }
        }
    }

    /// Remove every stored field. Never fails.
    pub fn clear(&self) {
        self.set_current(None);
        for key in self.keys.all() {
            if let Err(e) = self.backend.remove(key) {
                warn!(key, error = %e, "Failed to remove session entry");
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_millis())
    }

    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        self.load()
            .map(|session| session.is_valid_at(now_ms))
            .unwrap_or(false)
    }

    /// The access token, only while the session is valid.
    pub fn valid_access_token(&self) -> Option<String> {
        self.load()
            .filter(|session| session.is_valid())
            .map(|session| session.access_token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.load()
            .map(|session| session.refresh_token)
            .filter(|token| !token.is_empty())
    }
}
