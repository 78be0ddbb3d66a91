use thiserror::Error;

use crate::auth::StorageError;

/// Errors surfaced by the session and API layers.
///
/// Every variant carries owned strings so one refresh outcome can be cloned
/// out to every request queued behind it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait and try again")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error. Please check your connection: {0}")]
    NetworkUnavailable(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Signed out while the request was in flight")]
    SignedOut,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Classify a non-success status from a data endpoint.
    pub fn from_status(status: u16, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::Unknown(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Classify a non-success status from the login endpoint, where a 401
    /// means the credentials were rejected rather than the token expiring.
    /// Statuses other than 401, 403 and 5xx are unknown failures.
    pub fn from_login_status(status: u16, body: &str) -> Self {
        match Self::from_status(status, body) {
            ApiError::Unauthorized => ApiError::InvalidCredentials,
            e @ (ApiError::AccessDenied(_) | ApiError::ServerError(_) | ApiError::Unknown(_)) => e,
            _ => ApiError::Unknown(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// Map a transport-level failure where no response was received.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::NetworkUnavailable(format!("request timed out: {}", err))
        } else if let Some(status) = err.status() {
            ApiError::from_status(status.as_u16(), "")
        } else {
            ApiError::NetworkUnavailable(err.to_string())
        }
    }

    /// Whether this error means the caller must sign in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized
                | ApiError::NoRefreshToken
                | ApiError::RefreshFailed(_)
                | ApiError::SignedOut
        )
    }
}
