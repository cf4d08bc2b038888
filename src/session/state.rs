//! Immutable authentication state snapshots.

use crate::error::AuthError;
use crate::models::User;

/// One snapshot of the session. A fresh snapshot replaces the previous one
/// on every transition; listeners never observe partial mutation.
///
/// Invariants:
/// - `is_authenticated` implies `user` and `access_token` are present
/// - `is_loading` implies not `is_authenticated`
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub is_authenticated: bool,
    /// True only during the initialization window before the first
    /// resolution.
    pub is_loading: bool,
    pub user: Option<User>,
    pub access_token: Option<String>,
    /// Last operation's failure, cleared on the next success
    pub error: Option<AuthError>,
}

impl AuthState {
    pub(crate) fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    pub(crate) fn authenticated(user: User, access_token: String) -> Self {
        Self {
            is_authenticated: true,
            is_loading: false,
            user: Some(user),
            access_token: Some(access_token),
            error: None,
        }
    }

    pub(crate) fn unauthenticated(error: Option<AuthError>) -> Self {
        Self {
            error,
            ..Self::default()
        }
    }

    pub(crate) fn holds_invariants(&self) -> bool {
        let auth_ok = !self.is_authenticated || (self.user.is_some() && self.access_token.is_some());
        let loading_ok = !self.is_loading || !self.is_authenticated;
        auth_ok && loading_ok
    }
}
