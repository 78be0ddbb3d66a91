//! Session coordinator: the single owner of authentication state.
//!
//! Transitions:
//!
//! ```text
//! Anonymous      --login-->    Authenticating --ok-->  Authenticated
//!                                             --err--> Anonymous
//! Authenticated  --refresh-->  Refreshing     --ok-->  Authenticated
//!                                             --err--> Anonymous (tokens cleared)
//! any            --logout-->   Anonymous
//! ```
//!
//! Login, refresh and logout are serialized by one async mutex, so the token
//! store sees at most one mutation sequence at a time. Logout first signals
//! any in-flight login or refresh to abandon its server call, so it never
//! waits on a hung request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::backend::{AuthBackend, TokenGrant};
use super::session::{now_millis, AuthSnapshot, AuthState, Credentials, Session, User};
use super::token_store::{compute_expiry, TokenStore};
use crate::api::ApiError;

/// What the request authenticator needs from the session owner.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The access token, only while the session is valid.
    fn bearer_token(&self) -> Option<String>;

    /// A session exists but its token is inside the expiry buffer.
    fn needs_refresh(&self) -> bool;

    /// Rotate tokens and return the new access token.
    async fn refresh_access_token(&self) -> Result<String, ApiError>;
}

pub struct SessionCoordinator {
    backend: Arc<dyn AuthBackend>,
    tokens: TokenStore,
    login_timeout: Duration,
    snapshot: watch::Sender<AuthSnapshot>,
    transition: Mutex<()>,
    /// Bumped by every logout.
    sign_outs: watch::Sender<u64>,
}

impl SessionCoordinator {
    /// Build a coordinator, restoring any session already in the store.
    pub fn new(backend: Arc<dyn AuthBackend>, tokens: TokenStore, login_timeout: Duration) -> Self {
        let initial = match tokens.load() {
            Some(session) => {
                info!(
                    user = %session.user.email,
                    valid = session.is_valid(),
                    "Restored stored session"
                );
                AuthSnapshot {
                    state: AuthState::Authenticated,
                    user: Some(session.user),
                }
            }
            None => {
                debug!("No stored session found");
                AuthSnapshot::default()
            }
        };
        let (snapshot, _) = watch::channel(initial);

        Self {
            backend,
            tokens,
            login_timeout,
            snapshot,
            transition: Mutex::new(()),
            sign_outs: watch::channel(0).0,
        }
    }

    // =========================================================================
    // Observable state
    // =========================================================================

    /// Receive every state change. State and user change together.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> AuthState {
        self.snapshot.borrow().state
    }

    pub fn current_user(&self) -> Option<User> {
        self.snapshot.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot.borrow().is_loading()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.snapshot
            .borrow()
            .user
            .as_ref()
            .map(|user| user.role == role)
            .unwrap_or(false)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.has_role(role.as_ref()))
    }

    /// Whether the stored token can currently be attached to requests.
    pub fn has_valid_token(&self) -> bool {
        self.tokens.is_valid()
    }

    fn publish(&self, state: AuthState, user: Option<User>) {
        debug!(?state, "Auth state transition");
        self.snapshot.send_replace(AuthSnapshot { state, user });
    }

    fn reset(&self) {
        self.tokens.clear();
        self.publish(AuthState::Anonymous, None);
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Sign in. Any failure leaves the coordinator anonymous with nothing
    /// persisted. The remote call is abandoned after the login timeout.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let mut signed_out = self.sign_outs.subscribe();
        let _transition = self.transition.lock().await;
        info!(email = %credentials.email, "Signing in");
        self.publish(AuthState::Authenticating, None);

        let attempt = tokio::time::timeout(self.login_timeout, self.backend.login(credentials));
        let outcome = tokio::select! {
            result = attempt => match result {
                Ok(result) => result,
                Err(_) => Err(ApiError::Timeout(self.login_timeout.as_secs())),
            },
            _ = signed_out.changed() => Err(ApiError::SignedOut),
        };

        let session = match outcome.and_then(Self::session_from_login) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Sign in failed");
                self.reset();
                return Err(e);
            }
        };

        if let Err(e) = self.tokens.save(&session) {
            warn!(error = %e, "Failed to persist session");
            self.reset();
            return Err(e.into());
        }

        self.publish(AuthState::Authenticated, Some(session.user.clone()));
        info!(user = %session.user.email, role = %session.user.role, "Sign in successful");
        Ok(session.user)
    }

    fn session_from_login(grant: TokenGrant) -> Result<Session, ApiError> {
        let user = grant
            .user
            .ok_or_else(|| ApiError::InvalidResponse("login response missing user".to_string()))?;
        Ok(Session {
            access_token: grant.token,
            refresh_token: grant.refresh_token.unwrap_or_default(),
            user,
            expires_at: compute_expiry(grant.expires_in.as_deref().unwrap_or_default(), now_millis()),
        })
    }

    /// Rotate tokens. On any failure the session is dropped locally and the
    /// caller must sign in again.
    pub async fn refresh(&self) -> Result<Session, ApiError> {
        let mut signed_out = self.sign_outs.subscribe();
        let _transition = self.transition.lock().await;

        let current = match self.tokens.load() {
            Some(session) if !session.refresh_token.is_empty() => session,
            _ => {
                warn!("Refresh requested without a refresh token");
                self.reset();
                return Err(ApiError::NoRefreshToken);
            }
        };

        self.publish(AuthState::Refreshing, Some(current.user.clone()));
        debug!("Refreshing access token");

        let restore = RestoreOnCancel {
            snapshot: &self.snapshot,
            previous: Some(AuthSnapshot {
                state: AuthState::Authenticated,
                user: Some(current.user.clone()),
            }),
        };
        let outcome = tokio::select! {
            result = self.backend.refresh(&current.refresh_token) => result,
            _ = signed_out.changed() => {
                restore.disarm();
                debug!("Refresh abandoned for sign out");
                return Err(ApiError::SignedOut);
            }
        };
        restore.disarm();

        let grant = match outcome {
            Ok(grant) => grant,
            Err(e) => {
                warn!(error = %e, "Token refresh failed, signing out");
                self.reset();
                return Err(ApiError::RefreshFailed(e.to_string()));
            }
        };

        let rotated = Session {
            access_token: grant.token,
            refresh_token: grant
                .refresh_token
                .filter(|token| !token.is_empty())
                .unwrap_or(current.refresh_token),
            user: grant.user.unwrap_or(current.user),
            expires_at: compute_expiry(grant.expires_in.as_deref().unwrap_or_default(), now_millis()),
        };

        if let Err(e) = self.tokens.save(&rotated) {
            warn!(error = %e, "Failed to persist refreshed session, signing out");
            self.reset();
            return Err(e.into());
        }

        self.publish(AuthState::Authenticated, Some(rotated.user.clone()));
        info!("Token refreshed successfully");
        Ok(rotated)
    }

    /// Sign out. Always succeeds locally; the server is notified in the
    /// background and its answer ignored. An in-flight login or refresh is
    /// abandoned with [`ApiError::SignedOut`].
    pub async fn logout(&self) {
        self.sign_outs.send_modify(|count| *count += 1);
        let _transition = self.transition.lock().await;
        let access_token = self.tokens.load().map(|session| session.access_token);
        self.reset();
        info!("Signed out");

        if let Some(token) = access_token {
            let backend = self.backend.clone();
            tokio::spawn(async move {
                if let Err(e) = backend.logout(&token).await {
                    debug!(error = %e, "Remote logout failed (ignored)");
                }
            });
        }
    }
}

/// Republishes the pre-refresh snapshot if a refresh is dropped while
/// waiting on the server.
struct RestoreOnCancel<'a> {
    snapshot: &'a watch::Sender<AuthSnapshot>,
    previous: Option<AuthSnapshot>,
}

impl RestoreOnCancel<'_> {
    fn disarm(mut self) {
        self.previous = None;
    }
}

impl Drop for RestoreOnCancel<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            debug!("Refresh cancelled, restoring previous state");
            self.snapshot.send_replace(previous);
        }
    }
}

#[async_trait]
impl SessionProvider for SessionCoordinator {
    fn bearer_token(&self) -> Option<String> {
        self.tokens.valid_access_token()
    }

    fn needs_refresh(&self) -> bool {
        self.tokens
            .load()
            .map(|session| !session.is_valid())
            .unwrap_or(false)
    }

    async fn refresh_access_token(&self) -> Result<String, ApiError> {
        self.refresh().await.map(|session| session.access_token)
    }
}
