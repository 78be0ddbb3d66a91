//! Wiring of the session, API and review layers from a [`Config`].

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::api::{ApiClient, ApiError, HttpAuthBackend, RequestAuthenticator, Transport};
use crate::auth::{open_store, Credentials, KeyValueStore, SessionCoordinator, TokenStore, User};
use crate::cache::CacheManager;
use crate::config::Config;
use crate::reviews::ReviewService;

/// Response cache lives beside the session file, in its own directory.
const RESPONSE_CACHE_DIR: &str = "responses";

/// One signed-in (or anonymous) client of the review API.
pub struct Reviewdesk {
    config: Config,
    session: Arc<SessionCoordinator>,
    api: Arc<RequestAuthenticator>,
    reviews: ReviewService,
}

impl Reviewdesk {
    /// Build everything from configuration: reqwest transport, configured
    /// token storage and on-disk response cache.
    pub fn connect(config: Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ApiClient::new(&config)?);
        let store = open_store(&config)?;
        let cache = CacheManager::new(config.cache_dir()?.join(RESPONSE_CACHE_DIR))?;
        Ok(Self::with_parts(config, transport, store, Some(cache)))
    }

    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
        cache: Option<CacheManager>,
    ) -> Self {
        let backend = Arc::new(HttpAuthBackend::new(transport.clone()));
        let tokens = TokenStore::new(store, config.storage_keys.clone());
        let session = Arc::new(SessionCoordinator::new(
            backend,
            tokens,
            config.login_timeout(),
        ));
        let api = Arc::new(RequestAuthenticator::new(transport, session.clone()));
        let mut reviews = ReviewService::new(api.clone(), config.data_policy);
        if let Some(cache) = cache {
            reviews = reviews.with_cache(cache);
        }
        info!(api_url = %config.api_url, policy = ?config.data_policy, "Client ready");

        Self {
            config,
            session,
            api,
            reviews,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionCoordinator> {
        &self.session
    }

    pub fn api(&self) -> &Arc<RequestAuthenticator> {
        &self.api
    }

    pub fn reviews(&self) -> &ReviewService {
        &self.reviews
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        self.session.login(&Credentials::new(email, password)).await
    }

    /// Sign out and forget cached review data.
    pub async fn logout(&self) {
        self.session.logout().await;
        self.reviews.forget();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::ApiResponse;
    use crate::auth::MemoryStore;
    use crate::config::DataPolicy;
    use crate::testing::MockTransport;

    fn backend() -> MockTransport {
        MockTransport::new(|req| {
            let body = match req.path.as_str() {
                "/auth/login" => json!({
                    "success": true,
                    "data": {
                        "token": "jwt-access",
                        "refreshToken": "jwt-refresh",
                        "expiresIn": "1h",
                        "user": {"id": "1", "email": "admin@example.com", "name": "Admin User", "role": "admin"}
                    }
                }),
                "/auth/logout" => json!({"success": true}),
                "/reviews/stats" if req.bearer.as_deref() == Some("jwt-access") => json!({
                    "success": true,
                    "data": {"totalReviews": 7, "averageRating": 4.1}
                }),
                _ => return Ok(ApiResponse::new(401, "")),
            };
            Ok(ApiResponse::new(200, body.to_string()))
        })
    }

    #[tokio::test]
    async fn test_end_to_end_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_policy: DataPolicy::Strict,
            ..Config::default()
        };
        let transport = Arc::new(backend());
        let desk = Reviewdesk::with_parts(
            config,
            transport.clone(),
            Arc::new(MemoryStore::new()),
            Some(CacheManager::new(dir.path().to_path_buf()).unwrap()),
        );

        let user = desk.login("admin@example.com", "password").await.unwrap();
        assert_eq!(user.role, "admin");
        assert!(desk.session().is_authenticated());

        let stats = desk.reviews().stats().await.unwrap();
        assert_eq!(stats.total_reviews, 7);
        assert!(dir.path().join("stats.json").exists());

        desk.logout().await;
        assert!(!desk.session().is_authenticated());
        assert!(!dir.path().join("stats.json").exists());
    }

    #[tokio::test]
    async fn test_rejected_login_surfaces_invalid_credentials() {
        let desk = Reviewdesk::with_parts(
            Config::default(),
            Arc::new(MockTransport::fixed(401, r#"{"success": false}"#)),
            Arc::new(MemoryStore::new()),
            None,
        );
        assert_eq!(
            desk.login("admin@example.com", "wrong").await.unwrap_err(),
            ApiError::InvalidCredentials
        );
        assert!(!desk.session().is_authenticated());
    }
}
