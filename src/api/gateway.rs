//! Stateless request functions over the credential API.
//!
//! Every endpoint call builds a JSON body (omitting absent optional fields),
//! attaches a bearer header when a token is supplied, and unwraps the
//! server's `{"status": "ok", "data": ...}` envelope so callers only ever see
//! domain payloads. Non-2xx statuses and transport failures surface as
//! typed `AuthError`s.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::AuthError;
use crate::models::{TokenPair, TokenStatus, User, VerifiedSession};

use super::transport::{Method, Transport, TransportRequest};

/// Server response envelope. `data` is absent on bare acknowledgements.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    // `default = "Option::default"` keeps the derive from requiring
    // `T: Default` for the absent-data case
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct CredentialGateway {
    transport: Arc<dyn Transport>,
    base_url: String,
    channel_id: Option<String>,
}

impl CredentialGateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        channel_id: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
            channel_id,
        }
    }

    /// Request an OTP be delivered to the given contact (email or phone).
    pub async fn request_otp(&self, contact: &str) -> Result<(), AuthError> {
        let mut body = json!({ "contact": contact });
        if let Some(ref channel) = self.channel_id {
            body["channelId"] = json!(channel);
        }

        debug!(contact, "requesting OTP");
        self.post_ack("/auth/otp/request", body, None).await
    }

    /// Exchange a delivered OTP for a verified session.
    pub async fn verify_otp(&self, contact: &str, code: &str) -> Result<VerifiedSession, AuthError> {
        let mut body = json!({ "contact": contact, "code": code });
        if let Some(ref channel) = self.channel_id {
            body["channelId"] = json!(channel);
        }

        debug!(contact, "verifying OTP");
        self.post("/auth/otp/verify", body, None)
            .await
            .map_err(AuthError::into_credential_failure)
    }

    /// Exchange a refresh token for a new access/refresh pair.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let body = json!({ "refreshToken": refresh_token });

        debug!("exchanging refresh token");
        self.post("/auth/token/refresh", body, None)
            .await
            .map_err(AuthError::into_credential_failure)
    }

    /// Check whether an access token is still accepted by the server.
    pub async fn validate_token(&self, token: &str) -> Result<TokenStatus, AuthError> {
        self.post("/auth/token/validate", json!({}), Some(token)).await
    }

    /// Revoke an access token server-side.
    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        debug!("revoking access token");
        self.post_ack("/auth/token/revoke", json!({}), Some(token)).await
    }

    /// Fetch the latest user record for the bearer of the given token.
    pub async fn current_user(&self, token: &str) -> Result<User, AuthError> {
        self.get("/auth/me", Some(token)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        bearer: Option<&str>,
    ) -> Result<T, AuthError> {
        let response = self
            .transport
            .perform(TransportRequest {
                method: Method::Post,
                url: self.url(path),
                bearer: bearer.map(str::to_string),
                body: Some(body),
            })
            .await?;

        let envelope: Envelope<T> = Self::check_response(path, response.status, &response.body)?;
        envelope.data.ok_or_else(|| AuthError::Server {
            status: response.status,
            body: format!("{}: envelope missing data", path),
        })
    }

    /// POST where the success payload is a bare acknowledgement.
    async fn post_ack(&self, path: &str, body: Value, bearer: Option<&str>) -> Result<(), AuthError> {
        let response = self
            .transport
            .perform(TransportRequest {
                method: Method::Post,
                url: self.url(path),
                bearer: bearer.map(str::to_string),
                body: Some(body),
            })
            .await?;

        Self::check_response::<Value>(path, response.status, &response.body)?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, bearer: Option<&str>) -> Result<T, AuthError> {
        let response = self
            .transport
            .perform(TransportRequest {
                method: Method::Get,
                url: self.url(path),
                bearer: bearer.map(str::to_string),
                body: None,
            })
            .await?;

        let envelope: Envelope<T> = Self::check_response(path, response.status, &response.body)?;
        envelope.data.ok_or_else(|| AuthError::Server {
            status: response.status,
            body: format!("{}: envelope missing data", path),
        })
    }

    /// Map non-2xx statuses to errors and parse the envelope on success.
    /// A 2xx body whose envelope status is not "ok" counts as a server fault.
    fn check_response<T: DeserializeOwned>(
        path: &str,
        status: u16,
        body: &str,
    ) -> Result<Envelope<T>, AuthError> {
        if !(200..300).contains(&status) {
            return Err(AuthError::from_status(status, body));
        }

        let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| AuthError::Server {
            status,
            body: format!("{}: malformed envelope: {}", path, e),
        })?;

        if envelope.status != "ok" {
            return Err(AuthError::Server {
                status,
                body: envelope
                    .message
                    .unwrap_or_else(|| format!("{}: envelope status {:?}", path, envelope.status)),
            });
        }

        Ok(envelope)
    }
}
