//! HTTP transport and auth endpoints for the review API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::request::{ApiRequest, ApiResponse, Transport, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH};
use super::ApiError;
use crate::auth::{AuthBackend, Credentials, TokenGrant};
use crate::config::Config;
use crate::models::ApiEnvelope;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: Config,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.api_url
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.config.endpoint(&request.path);
        // Sign-in, refresh and sign-out report a 429 immediately
        let max_retries = if request.is_auth_endpoint() {
            0
        } else {
            MAX_RATE_LIMIT_RETRIES
        };
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut builder = self
                .client
                .request(request.method.clone(), &url)
                .header(header::ACCEPT, "application/json");
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(ref token) = request.bearer {
                builder = builder.bearer_auth(token);
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|e| {
                debug!(url = %url, error = %e, "Request failed without a response");
                ApiError::from_transport(&e)
            })?;

            let status = response.status().as_u16();
            if status == 429 && retries < max_retries {
                retries += 1;
                warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2; // Exponential backoff
                continue;
            }

            let body = response.text().await.map_err(|e| ApiError::from_transport(&e))?;
            debug!(method = %request.method, url = %url, status, "Response received");
            return Ok(ApiResponse::new(status, body));
        }
    }
}

/// Login and refresh answer either enveloped or with the bare grant.
#[derive(Deserialize)]
#[serde(untagged)]
enum GrantBody {
    Wrapped(ApiEnvelope<TokenGrant>),
    Bare(TokenGrant),
}

impl GrantBody {
    fn into_grant(self) -> Result<TokenGrant, ApiError> {
        match self {
            GrantBody::Wrapped(envelope) => envelope.into_data(),
            GrantBody::Bare(grant) => Ok(grant),
        }
    }
}

/// The auth endpoints, reached through a [`Transport`] directly so they are
/// never subject to refresh-and-replay.
pub struct HttpAuthBackend {
    transport: Arc<dyn Transport>,
}

impl HttpAuthBackend {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).json(json!({
            "email": credentials.email,
            "password": credentials.password,
        }));
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(ApiError::from_login_status(response.status, &response.body));
        }
        response.json::<GrantBody>()?.into_grant()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH).json(json!({ "refreshToken": refresh_token }));
        let response = self.transport.execute(request).await?.error_for_status()?;
        response.json::<GrantBody>()?.into_grant()
    }

    async fn logout(&self, access_token: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post(LOGOUT_PATH).with_bearer(Some(access_token.to_string()));
        self.transport.execute(request).await?.error_for_status()?;
        Ok(())
    }
}
