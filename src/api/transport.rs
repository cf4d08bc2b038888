//! HTTP transport seam.
//!
//! The gateway talks to the network through the `Transport` trait so the
//! wire plumbing can be swapped out (tests inject a scripted double). The
//! production implementation is a thin layer over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AuthError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    /// Bearer token attached as an Authorization header when present
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// One request/response exchange. Transport-level failures (DNS, refused
/// connection, timeout) surface as `AuthError::Network`; HTTP error statuses
/// come back as ordinary responses for the gateway to map.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, AuthError>;
}

/// `reqwest`-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuthError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, AuthError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        if let Some(ref token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("request to {} failed: {}", request.url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Network(format!("failed to read response body: {}", e)))?;

        Ok(TransportResponse { status, body })
    }
}
