//! The remote side of authentication.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::session::{Credentials, User};
use crate::api::ApiError;

/// Token grant returned by the login and refresh endpoints.
///
/// Refresh responses may omit the rotated refresh token or the user; the
/// coordinator keeps the stored values in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    #[serde(alias = "accessToken")]
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Relative lifetime such as `"7d"` or `"15m"`.
    #[serde(default)]
    pub expires_in: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `POST /auth/login`. Errors are already classified for display.
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError>;

    /// `POST /auth/refresh`.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ApiError>;

    /// `POST /auth/logout`. Callers ignore the outcome.
    async fn logout(&self, access_token: &str) -> Result<(), ApiError>;
}
