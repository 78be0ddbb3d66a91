//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::auth::{AuthBackend, Credentials, TokenGrant, User};

pub fn sample_user() -> User {
    User {
        id: "1".to_string(),
        email: "admin@example.com".to_string(),
        name: "Admin User".to_string(),
        role: "admin".to_string(),
    }
}

pub fn grant(token: &str, refresh_token: &str, expires_in: &str) -> TokenGrant {
    TokenGrant {
        token: token.to_string(),
        refresh_token: Some(refresh_token.to_string()),
        expires_in: Some(expires_in.to_string()),
        user: Some(sample_user()),
    }
}

struct AuthScript {
    login: Result<TokenGrant, ApiError>,
    login_delay: Duration,
    refresh: Result<TokenGrant, ApiError>,
    refresh_delay: Duration,
    logout: Result<(), ApiError>,
    logout_delay: Duration,
    refresh_tokens_seen: Vec<String>,
    logout_tokens_seen: Vec<String>,
}

/// Scriptable auth endpoints.
pub struct MockAuthBackend {
    script: Mutex<AuthScript>,
    refresh_calls: AtomicUsize,
}

impl MockAuthBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(AuthScript {
                login: Ok(grant("access-1", "refresh-1", "1h")),
                login_delay: Duration::ZERO,
                refresh: Ok(grant("access-2", "refresh-2", "1h")),
                refresh_delay: Duration::ZERO,
                logout: Ok(()),
                logout_delay: Duration::ZERO,
                refresh_tokens_seen: Vec::new(),
                logout_tokens_seen: Vec::new(),
            }),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, AuthScript> {
        self.script.lock().unwrap()
    }

    pub fn set_login_grant(&self, grant: TokenGrant) {
        self.script().login = Ok(grant);
    }

    pub fn fail_login_with(&self, err: ApiError) {
        self.script().login = Err(err);
    }

    pub fn set_login_delay(&self, delay: Duration) {
        self.script().login_delay = delay;
    }

    pub fn set_refresh_grant(&self, grant: TokenGrant) {
        self.script().refresh = Ok(grant);
    }

    pub fn fail_refresh_with(&self, err: ApiError) {
        self.script().refresh = Err(err);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.script().refresh_delay = delay;
    }

    pub fn fail_logout_with(&self, err: ApiError) {
        self.script().logout = Err(err);
    }

    pub fn set_logout_delay(&self, delay: Duration) {
        self.script().logout_delay = delay;
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.script().refresh_tokens_seen.clone()
    }

    pub fn logout_tokens_seen(&self) -> Vec<String> {
        self.script().logout_tokens_seen.clone()
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    async fn login(&self, _credentials: &Credentials) -> Result<TokenGrant, ApiError> {
        let (outcome, delay) = {
            let script = self.script();
            (script.login.clone(), script.login_delay)
        };
        pause(delay).await;
        outcome
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let (outcome, delay) = {
            let mut script = self.script();
            script.refresh_tokens_seen.push(refresh_token.to_string());
            (script.refresh.clone(), script.refresh_delay)
        };
        pause(delay).await;
        outcome
    }

    async fn logout(&self, access_token: &str) -> Result<(), ApiError> {
        let (outcome, delay) = {
            let mut script = self.script();
            script.logout_tokens_seen.push(access_token.to_string());
            (script.logout.clone(), script.logout_delay)
        };
        pause(delay).await;
        outcome
    }
}

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync>;

/// Transport answering from a closure and recording every request.
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the same status and body.
    pub fn fixed(status: u16, body: &str) -> Self {
        let body = body.to_string();
        Self::new(move |_| Ok(ApiResponse::new(status, body.clone())))
    }

    /// Never get a response.
    pub fn offline() -> Self {
        Self::new(|_| Err(ApiError::NetworkUnavailable("connection refused".to_string())))
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        // Give concurrent callers a chance to interleave
        tokio::task::yield_now().await;
        (self.handler)(&request)
    }
}
