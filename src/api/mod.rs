//! Credential API gateway module.
//!
//! This module provides the `CredentialGateway` for talking to the
//! credential-exchange endpoints (OTP request/verify, token refresh,
//! validate, revoke, current user) and the `Transport` seam it issues
//! requests through.
//!
//! The API uses JWT bearer token authentication and wraps every response
//! in a `{"status": "ok", "data": ...}` envelope that the gateway unwraps.

pub mod gateway;
pub mod transport;

pub use gateway::CredentialGateway;
pub use transport::{HttpTransport, Method, Transport, TransportRequest, TransportResponse};
