//! Access checks for protected screens.

use tracing::debug;

use super::coordinator::SessionCoordinator;

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// No usable session; send the user to the login screen.
    LoginRequired,
    /// Signed in but lacking every required role.
    Forbidden,
}

impl SessionCoordinator {
    /// Check access without touching the network. An empty role list only
    /// requires a valid session.
    pub fn check_access<S: AsRef<str>>(&self, required_roles: &[S]) -> Access {
        if !self.is_authenticated() || !self.has_valid_token() {
            return Access::LoginRequired;
        }
        if required_roles.is_empty() || self.has_any_role(required_roles) {
            Access::Granted
        } else {
            Access::Forbidden
        }
    }

    /// Like [`check_access`](Self::check_access), but first tries a refresh
    /// when the user is signed in with a token inside its expiry buffer.
    pub async fn authorize<S: AsRef<str>>(&self, required_roles: &[S]) -> Access {
        if self.is_authenticated() && !self.has_valid_token() {
            if let Err(e) = self.refresh().await {
                debug!(error = %e, "Refresh during access check failed");
                return Access::LoginRequired;
            }
        }
        self.check_access(required_roles)
    }

    /// The login screen is only shown to signed-out users.
    pub fn can_show_login(&self) -> bool {
        !self.is_authenticated()
    }
}
