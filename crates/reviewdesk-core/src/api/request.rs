//! Request and response values passed across the transport seam.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;

use super::ApiError;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Endpoints that must never be augmented or retried by the authenticator.
const AUTH_ENDPOINTS: [&str; 3] = [LOGIN_PATH, REFRESH_PATH, LOGOUT_PATH];

/// An outgoing API call, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Replace (or remove) the bearer credential.
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }

    pub fn is_auth_endpoint(&self) -> bool {
        AUTH_ENDPOINTS.iter().any(|endpoint| self.path.contains(endpoint))
    }
}

/// A received HTTP response. Transports return every status they get;
/// classification happens in the layers above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("failed to parse JSON body: {}", e)))
    }

    /// Turn a non-2xx response into its classified error.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.body))
        }
    }
}

/// Executes requests against the remote API.
///
/// `Err` is reserved for the case where no response arrived at all.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_auth_endpoint() {
        assert!(ApiRequest::post("/auth/login").is_auth_endpoint());
        assert!(ApiRequest::post("/auth/refresh").is_auth_endpoint());
        assert!(ApiRequest::post("/auth/logout").is_auth_endpoint());
        assert!(!ApiRequest::get("/reviews").is_auth_endpoint());
        assert!(!ApiRequest::get("/reviews/7453").is_auth_endpoint());
    }

    #[test]
    fn test_builder_collects_query() {
        let req = ApiRequest::get("/reviews")
            .query("page", 2)
            .query("limit", 50)
            .with_bearer(Some("abc".into()));
        assert_eq!(
            req.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "50".to_string())
            ]
        );
        assert_eq!(req.bearer.as_deref(), Some("abc"));
    }

    #[test]
    fn test_error_for_status() {
        assert!(ApiResponse::new(204, "").error_for_status().is_ok());
        assert_eq!(
            ApiResponse::new(401, "").error_for_status().unwrap_err(),
            ApiError::Unauthorized
        );
    }
}
