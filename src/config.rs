//! Construction-time configuration for the session controller.
//!
//! All options are read once when the controller is built; nothing here is
//! mutable afterwards.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Seconds before expiry at which a token is considered due for refresh.
/// 5 minutes leaves room for clock skew and slow networks.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: u64 = 300;

/// Assumed validity of the token returned by OTP verification, in seconds.
///
/// The verify endpoint hands back a custom token without an expiry or a
/// refresh token, so the client has to assume a validity window. 3 days
/// mirrors the server's session policy. Follow-up: drop this once the verify
/// endpoint returns a proper access/refresh pair.
pub const DEFAULT_VERIFIED_SESSION_VALIDITY_SECS: u64 = 259_200;

/// Which token store variant the consumer wants.
///
/// `Durable` still requires the persistence capability to be available at
/// construction; when it is not, the controller falls back to `Volatile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoragePreference {
    Durable,
    Volatile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the credential API, without a trailing slash.
    pub base_url: String,
    pub storage: StoragePreference,
    /// Proactively refresh tokens before they expire.
    pub auto_refresh: bool,
    pub refresh_threshold_secs: u64,
    /// Optional delivery channel identifier forwarded on OTP requests.
    pub channel_id: Option<String>,
    pub verified_session_validity_secs: u64,
    /// Override for the durable store directory. Defaults to the platform
    /// cache directory.
    pub storage_dir: Option<PathBuf>,
}

impl AuthConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            storage: StoragePreference::Durable,
            auto_refresh: true,
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            channel_id: None,
            verified_session_validity_secs: DEFAULT_VERIFIED_SESSION_VALIDITY_SECS,
            storage_dir: None,
        }
    }
}
