//! Token storage abstraction.
//!
//! Four independently stored fields make up a persisted session: access
//! token, refresh token, expiry timestamp, and the user record. They are not
//! written transactionally as a unit, so readers must tolerate partial
//! presence. Two conforming variants exist: a file-backed `DurableStore` and
//! an in-process `VolatileStore`, picked exactly once at construction.

pub mod durable;
pub mod volatile;

pub use durable::DurableStore;
pub use volatile::VolatileStore;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{AuthConfig, StoragePreference};
use crate::error::AuthError;

/// The persisted session fields. Every field is optional; consumers treat
/// partial presence as "no valid session".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct SessionRecord {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Epoch seconds
    #[serde(default)]
    pub token_expiry: Option<i64>,
    #[serde(default)]
    pub user: Option<Value>,
}

/// Tagged store choice, resolved once at construction and fixed afterwards.
#[derive(Debug)]
pub enum TokenStore {
    Durable(DurableStore),
    Volatile(VolatileStore),
}

impl TokenStore {
    /// Pick a variant from the declared preference and the capability probe.
    ///
    /// A durable preference degrades to volatile (with a warning) when the
    /// capability probe failed or the backing directory cannot be opened.
    pub fn select(config: &AuthConfig, storage_available: bool) -> Self {
        match config.storage {
            StoragePreference::Durable if storage_available => {
                match DurableStore::new(config.storage_dir.clone()) {
                    Ok(store) => {
                        debug!("using durable token store");
                        TokenStore::Durable(store)
                    }
                    Err(error) => {
                        warn!(%error, "durable store unavailable, falling back to volatile");
                        TokenStore::Volatile(VolatileStore::new())
                    }
                }
            }
            StoragePreference::Durable => {
                debug!("persistent storage unavailable, using volatile token store");
                TokenStore::Volatile(VolatileStore::new())
            }
            StoragePreference::Volatile => TokenStore::Volatile(VolatileStore::new()),
        }
    }

    pub fn get_access_token(&self) -> Option<String> {
        match self {
            TokenStore::Durable(s) => s.get_access_token(),
            TokenStore::Volatile(s) => s.get_access_token(),
        }
    }

    pub fn set_access_token(&self, token: &str) -> Result<(), AuthError> {
        match self {
            TokenStore::Durable(s) => s.set_access_token(token),
            TokenStore::Volatile(s) => {
                s.set_access_token(token);
                Ok(())
            }
        }
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        match self {
            TokenStore::Durable(s) => s.get_refresh_token(),
            TokenStore::Volatile(s) => s.get_refresh_token(),
        }
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<(), AuthError> {
        match self {
            TokenStore::Durable(s) => s.set_refresh_token(token),
            TokenStore::Volatile(s) => {
                s.set_refresh_token(token);
                Ok(())
            }
        }
    }

    pub fn get_token_expiry(&self) -> Option<i64> {
        match self {
            TokenStore::Durable(s) => s.get_token_expiry(),
            TokenStore::Volatile(s) => s.get_token_expiry(),
        }
    }

    pub fn set_token_expiry(&self, expiry: i64) -> Result<(), AuthError> {
        match self {
            TokenStore::Durable(s) => s.set_token_expiry(expiry),
            TokenStore::Volatile(s) => {
                s.set_token_expiry(expiry);
                Ok(())
            }
        }
    }

    /// JSON round-tripped user record. A stored value that no longer
    /// deserializes into `T` reads as absent.
    pub fn get_user<T: DeserializeOwned>(&self) -> Option<T> {
        let value = match self {
            TokenStore::Durable(s) => s.get_user_value(),
            TokenStore::Volatile(s) => s.get_user_value(),
        }?;

        match serde_json::from_value(value) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "stored user record failed to deserialize");
                None
            }
        }
    }

    pub fn set_user<T: Serialize>(&self, user: &T) -> Result<(), AuthError> {
        let value = serde_json::to_value(user)
            .map_err(|e| AuthError::Storage(format!("failed to serialize user: {}", e)))?;

        match self {
            TokenStore::Durable(s) => s.set_user_value(value),
            TokenStore::Volatile(s) => {
                s.set_user_value(value);
                Ok(())
            }
        }
    }

    /// Reset all four fields. Never fails.
    pub fn clear(&self) {
        match self {
            TokenStore::Durable(s) => s.clear(),
            TokenStore::Volatile(s) => s.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn user(uid: &str) -> User {
        User {
            uid: uid.to_string(),
            email: format!("{}@example.com", uid),
            email_verified: false,
            display_name: None,
            photo_url: None,
            phone_number: None,
            provider: Some("otp".to_string()),
            provider_id: None,
        }
    }

    #[test]
    fn test_select_honors_volatile_preference() {
        let mut config = AuthConfig::new("https://auth.example.com");
        config.storage = StoragePreference::Volatile;
        assert!(matches!(
            TokenStore::select(&config, true),
            TokenStore::Volatile(_)
        ));
    }

    #[test]
    fn test_select_degrades_without_capability() {
        let config = AuthConfig::new("https://auth.example.com");
        assert!(matches!(
            TokenStore::select(&config, false),
            TokenStore::Volatile(_)
        ));
    }

    #[test]
    fn test_select_durable_with_capability() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AuthConfig::new("https://auth.example.com");
        config.storage_dir = Some(dir.path().to_path_buf());
        assert!(matches!(
            TokenStore::select(&config, true),
            TokenStore::Durable(_)
        ));
    }

    #[test]
    fn test_typed_user_round_trip() {
        let store = TokenStore::Volatile(VolatileStore::new());
        store.set_user(&user("u-1")).expect("write");

        let loaded: User = store.get_user().expect("user present");
        assert_eq!(loaded.uid, "u-1");
        assert_eq!(loaded.provider.as_deref(), Some("otp"));
    }

    #[test]
    fn test_incompatible_user_reads_as_absent() {
        let store = TokenStore::Volatile(VolatileStore::new());
        match &store {
            TokenStore::Volatile(s) => s.set_user_value(serde_json::json!("not a user object")),
            TokenStore::Durable(_) => unreachable!(),
        }

        let loaded: Option<User> = store.get_user();
        assert!(loaded.is_none());
    }
}
