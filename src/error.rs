//! Typed error taxonomy for every fallible operation in the crate.
//!
//! Each variant maps to a stable `kind()` string so consumers can branch on
//! failure category (e.g. prompt re-authentication on
//! `invalid-or-expired-credential`) without matching on message text.

use thiserror::Error;

/// Maximum length for server response bodies carried in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid or expired credential: {0}")]
    InvalidCredential(String),

    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl AuthError {
    /// Stable machine-readable failure category.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidInput(_) => "invalid-input",
            AuthError::InvalidCredential(_) => "invalid-or-expired-credential",
            AuthError::Unauthorized { .. } => "unauthorized",
            AuthError::NotAuthenticated(_) => "not-authenticated",
            AuthError::Network(_) => "network-failure",
            AuthError::Server { .. } => "server-failure",
            AuthError::Storage(_) => "storage-failure",
            AuthError::Unknown(_) => "unknown",
        }
    }

    /// HTTP status code, when the failure came from an HTTP response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            AuthError::Unauthorized { status } | AuthError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Truncate a response body to avoid carrying excessive data in errors
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        // Back off to a char boundary so multibyte bodies cannot panic
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..end],
            body.len()
        )
    }

    /// Map a non-success HTTP status and response body to an error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status {
            400 | 422 => AuthError::InvalidInput(truncated),
            401 | 403 => AuthError::Unauthorized { status },
            500..=599 => AuthError::Server {
                status,
                body: truncated,
            },
            _ => AuthError::Unknown(format!("HTTP {}: {}", status, truncated)),
        }
    }

    /// Reinterpret an authorization rejection as a credential failure.
    ///
    /// On the verify-OTP and token-refresh endpoints a 401/403 means the
    /// presented credential is bad or expired, not that the caller forgot a
    /// bearer header. Other variants pass through unchanged.
    pub(crate) fn into_credential_failure(self) -> Self {
        match self {
            AuthError::Unauthorized { status } => {
                AuthError::InvalidCredential(format!("rejected by server (HTTP {})", status))
            }
            other => other,
        }
    }
}
