//! authflow - client-side session and token lifecycle management.
//!
//! Turns a stateless set of credential-exchange API calls (OTP request and
//! verification, token refresh, revocation) into a durable, observable,
//! auto-renewing authenticated session:
//!
//! - [`SessionController`] owns the session state machine, restores sessions
//!   from storage, and proactively refreshes tokens before they expire
//! - [`TokenStore`] persists the session across restarts (file-backed) or
//!   holds it in process memory
//! - [`CredentialGateway`] wraps the credential API endpoints behind a
//!   pluggable [`Transport`]
//! - [`AuthState`] snapshots are fanned out synchronously to subscribers on
//!   every transition
//!
//! ```no_run
//! use authflow::{AuthConfig, SessionController};
//!
//! # async fn demo() -> Result<(), authflow::AuthError> {
//! let controller = SessionController::with_http(AuthConfig::new("https://auth.example.com"))?;
//! let _sub = controller.on_change(|state| {
//!     println!("authenticated: {}", state.is_authenticated);
//! });
//!
//! controller.initialize().await;
//! controller.request_otp("user@example.com").await?;
//! controller.verify_otp("user@example.com", "123456").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{CredentialGateway, HttpTransport, Transport, TransportRequest, TransportResponse};
pub use config::{AuthConfig, StoragePreference};
pub use error::AuthError;
pub use models::{TokenPair, TokenStatus, User, VerifiedSession};
pub use session::{AuthState, SessionController, Subscription};
pub use store::{DurableStore, TokenStore, VolatileStore};
