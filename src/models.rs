//! Domain and wire types exchanged with the credential API.
//!
//! Wire fields are camelCase; everything here is passthrough data the
//! session controller stores and hands back without interpreting.

use serde::{Deserialize, Serialize};

/// An authenticated user record. Opaque to the controller beyond `uid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable unique identity
    pub uid: String,
    pub email: String,
    #[serde(rename = "emailVerified", default)]
    pub email_verified: bool,
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(rename = "phoneNumber", default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Authentication method, e.g. "otp"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(rename = "providerId", default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

/// Access/refresh pair returned by the token refresh endpoint.
///
/// `expires_in` is relative seconds; the controller converts it to an
/// absolute expiry timestamp at the moment of receipt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
}

/// Success payload of OTP verification.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedSession {
    pub user: User,
    #[serde(rename = "customToken")]
    pub custom_token: String,
    #[serde(rename = "isNewUser", default)]
    pub is_new_user: bool,
}

/// Result of checking a token against the validate endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenStatus {
    pub valid: bool,
    #[serde(default)]
    pub uid: Option<String>,
}
