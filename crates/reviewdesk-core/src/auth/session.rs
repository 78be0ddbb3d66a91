use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Safety buffer before expiry during which a token is no longer attached.
pub const TOKEN_REFRESH_BUFFER_MS: i64 = 5 * 60 * 1000;

/// Authenticated staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

/// Login form values.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token pair, identity and absolute expiry (epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
    pub expires_at: i64,
}

impl Session {
    /// Valid while `now + buffer < expires_at`; at exactly the buffer it is
    /// already invalid.
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms.saturating_add(TOKEN_REFRESH_BUFFER_MS) < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_millis())
    }
}

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
    Refreshing,
}

/// Consistent view of the coordinator, published as one value so observers
/// never see state and user out of step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthSnapshot {
    pub state: AuthState,
    pub user: Option<User>,
}

impl AuthSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
            && matches!(self.state, AuthState::Authenticated | AuthState::Refreshing)
    }

    pub fn is_loading(&self) -> bool {
        self.state == AuthState::Authenticating
    }
}
