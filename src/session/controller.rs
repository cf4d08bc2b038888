//! The session controller: owns the in-memory auth state, drives
//! initialization from storage, the proactive refresh scheduler, and the
//! single mutation point that fans out to subscribers.
//!
//! # Concurrency
//!
//! All operations are async but there is no internal serialization of
//! overlapping operations: state transitions apply in the order their
//! triggering operations complete. In particular a manual `refresh()` racing
//! the scheduled refresh timer is allowed - both may fire, the token store
//! is last-write-wins, and the in-memory state reflects whichever refresh
//! completed last. Callers who need stricter ordering must provide it
//! themselves.
//!
//! The refresh timer is the only cancellable unit. It is cancelled on
//! `sign_out()` and before every reschedule; in-flight network requests are
//! never cancelled, and a late completion applied against an already-cleared
//! store safely overwrites rather than crashing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{CredentialGateway, HttpTransport, Transport};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{TokenPair, User, VerifiedSession};
use crate::store::TokenStore;

use super::listeners::{Listener, SubscriberRegistry, Subscription};
use super::state::AuthState;

/// Session controller. Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    config: AuthConfig,
    gateway: CredentialGateway,
    store: TokenStore,
    state: Mutex<AuthState>,
    listeners: Arc<SubscriberRegistry>,
    /// At most one pending proactive refresh timer per controller
    refresh_timer: Mutex<Option<JoinHandle<()>>>,
    init: OnceCell<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh_timer.lock().take() {
            handle.abort();
        }
    }
}

impl SessionController {
    /// Build a controller over the given transport.
    ///
    /// `storage_available` is the persistence capability probe result; when
    /// false a durable storage preference degrades to the volatile store.
    pub fn new(config: AuthConfig, transport: Arc<dyn Transport>, storage_available: bool) -> Self {
        let gateway =
            CredentialGateway::new(transport, config.base_url.clone(), config.channel_id.clone());
        let store = TokenStore::select(&config, storage_available);

        Self {
            inner: Arc::new(Inner {
                config,
                gateway,
                store,
                state: Mutex::new(AuthState::loading()),
                listeners: Arc::new(SubscriberRegistry::default()),
                refresh_timer: Mutex::new(None),
                init: OnceCell::new(),
            }),
        }
    }

    /// Build a controller with the production HTTP transport and a platform
    /// storage probe.
    pub fn with_http(config: AuthConfig) -> Result<Self, AuthError> {
        let transport = Arc::new(HttpTransport::new()?);
        let storage_available = dirs::cache_dir().is_some();
        Ok(Self::new(config, transport, storage_available))
    }

    /// Current snapshot.
    pub fn state(&self) -> AuthState {
        self.inner.state.lock().clone()
    }

    /// Subscribe to state transitions. The listener is invoked once
    /// immediately with the current snapshot, then on every transition until
    /// unsubscribed.
    pub fn on_change(&self, listener: impl Fn(&AuthState) + Send + Sync + 'static) -> Subscription {
        let snapshot = self.state();
        self.inner
            .listeners
            .subscribe(Box::new(listener) as Listener, &snapshot)
    }

    /// Resolve the session from storage. Idempotent: concurrent and repeat
    /// calls share the first run's outcome. Never fails; any internal error
    /// lands in the resulting snapshot's `error` field.
    pub async fn initialize(&self) -> AuthState {
        self.inner
            .init
            .get_or_init(|| async {
                self.run_initialize().await;
            })
            .await;
        self.state()
    }

    async fn run_initialize(&self) {
        debug!("initializing session from storage");

        let access_token = self.inner.store.get_access_token();
        let user: Option<User> = self.inner.store.get_user();
        let expiry = self.inner.store.get_token_expiry();

        let (token, user, expiry) = match (access_token, user, expiry) {
            (Some(token), Some(user), Some(expiry)) => (token, user, expiry),
            _ => {
                debug!("no complete stored session");
                self.inner.store.clear();
                self.set_state(AuthState::unauthenticated(None));
                return;
            }
        };

        let now = Utc::now().timestamp();
        if expiry > now {
            let validity = (expiry - now) as u64;
            info!(uid = %user.uid, validity_secs = validity, "restored session from storage");
            self.set_state(AuthState::authenticated(user, token));
            if self.inner.config.auto_refresh {
                self.schedule_refresh(validity);
            }
            return;
        }

        // Stored token already expired: one refresh attempt, then give up.
        // The expired token is never exposed to listeners.
        debug!("stored session expired, attempting refresh");
        match self.inner.store.get_refresh_token() {
            Some(refresh_token) => {
                if let Err(error) = self.perform_refresh(&refresh_token).await {
                    // perform_refresh already cleared storage and state
                    warn!(%error, "refresh during initialization failed");
                }
            }
            None => {
                self.inner.store.clear();
                self.set_state(AuthState::unauthenticated(None));
            }
        }
    }

    /// Ask the server to deliver an OTP to `contact`.
    pub async fn request_otp(&self, contact: &str) -> Result<(), AuthError> {
        self.inner.gateway.request_otp(contact).await
    }

    /// Exchange a delivered OTP for an authenticated session.
    ///
    /// The returned custom token is stored as the access token with an
    /// assumed validity window (`verified_session_validity_secs`); the
    /// server does not yet hand out a refresh pair at this point. On failure
    /// the previous state is left untouched.
    pub async fn verify_otp(&self, contact: &str, code: &str) -> Result<VerifiedSession, AuthError> {
        let session = self.inner.gateway.verify_otp(contact, code).await?;

        let validity = self.inner.config.verified_session_validity_secs;
        let expiry = Utc::now().timestamp() + validity as i64;
        self.inner.store.set_access_token(&session.custom_token)?;
        self.inner.store.set_user(&session.user)?;
        self.inner.store.set_token_expiry(expiry)?;

        info!(uid = %session.user.uid, is_new_user = session.is_new_user, "signed in");
        self.set_state(AuthState::authenticated(
            session.user.clone(),
            session.custom_token.clone(),
        ));
        if self.inner.config.auto_refresh {
            self.schedule_refresh(validity);
        }

        Ok(session)
    }

    /// Current access token, refreshed first when it is inside the refresh
    /// threshold so callers get a token usable for at least that window.
    /// `None` when unauthenticated or when the refresh attempt fails.
    pub async fn get_token(&self) -> Option<String> {
        if !self.state().is_authenticated {
            return None;
        }

        let now = Utc::now().timestamp();
        let threshold = self.inner.config.refresh_threshold_secs as i64;
        let expiry = self.inner.store.get_token_expiry();
        let due = expiry.map_or(true, |expiry| expiry - now <= threshold);

        if due {
            debug!("access token inside refresh threshold");
            match self.inner.store.get_refresh_token() {
                Some(refresh_token) => {
                    // Failure transitions to unauthenticated, which the
                    // final read below observes as a missing token
                    let _ = self.perform_refresh(&refresh_token).await;
                }
                None => {
                    // OTP-verified sessions carry no refresh token; the
                    // access token stays usable until its assumed expiry
                    if expiry.map_or(true, |expiry| expiry <= now) {
                        self.inner.store.clear();
                        self.set_state(AuthState::unauthenticated(Some(
                            AuthError::NotAuthenticated(
                                "session expired and no refresh token is stored".into(),
                            ),
                        )));
                    }
                }
            }
        }

        self.state().access_token
    }

    /// Manually exchange the stored refresh token for a new pair.
    ///
    /// Fails with `not-authenticated` (leaving state untouched) when no
    /// refresh token is stored; any other failure clears the session.
    pub async fn refresh(&self) -> Result<TokenPair, AuthError> {
        let Some(refresh_token) = self.inner.store.get_refresh_token() else {
            return Err(AuthError::NotAuthenticated("no refresh token stored".into()));
        };
        self.perform_refresh(&refresh_token).await
    }

    /// Exchange `refresh_token` and apply the outcome.
    ///
    /// Success persists the new pair and expiry, re-arms the scheduler, and
    /// keeps the session authenticated. Failure is non-recoverable without
    /// user action: storage is cleared and the state transitions to
    /// unauthenticated with the error attached. No automatic retry.
    async fn perform_refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let outcome: Result<TokenPair, AuthError> = async {
            let pair = self.inner.gateway.refresh_token(refresh_token).await?;

            let expiry = Utc::now().timestamp() + pair.expires_in as i64;
            self.inner.store.set_access_token(&pair.access_token)?;
            self.inner.store.set_refresh_token(&pair.refresh_token)?;
            self.inner.store.set_token_expiry(expiry)?;
            Ok(pair)
        }
        .await;

        match outcome {
            Ok(pair) => {
                // A sign-out may have raced this refresh; without a user
                // record there is no session to resurrect
                let user: Option<User> = self
                    .inner
                    .store
                    .get_user()
                    .or_else(|| self.state().user);
                match user {
                    Some(user) => {
                        debug!(expires_in = pair.expires_in, "token refreshed");
                        self.set_state(AuthState::authenticated(user, pair.access_token.clone()));
                        if self.inner.config.auto_refresh {
                            self.schedule_refresh(pair.expires_in);
                        }
                        Ok(pair)
                    }
                    None => {
                        debug!("refresh completed after sign-out, discarding");
                        self.inner.store.clear();
                        self.set_state(AuthState::unauthenticated(None));
                        Ok(pair)
                    }
                }
            }
            Err(error) => {
                self.cancel_refresh_timer();
                self.inner.store.clear();
                self.set_state(AuthState::unauthenticated(Some(error.clone())));
                Err(error)
            }
        }
    }

    /// Sign out. The server-side revoke is best effort: its failure is
    /// logged and swallowed, the local session is cleared unconditionally.
    pub async fn sign_out(&self) {
        self.cancel_refresh_timer();

        let token = self
            .inner
            .store
            .get_access_token()
            .or_else(|| self.state().access_token);
        if let Some(token) = token {
            if let Err(error) = self.inner.gateway.revoke_token(&token).await {
                warn!(%error, "best-effort token revocation failed");
            }
        }

        self.inner.store.clear();
        info!("signed out");
        self.set_state(AuthState::unauthenticated(None));
    }

    /// Fetch and persist the latest user record. `Ok(None)` when
    /// unauthenticated; failure propagates and leaves state unchanged.
    pub async fn current_user(&self) -> Result<Option<User>, AuthError> {
        let state = self.state();
        if !state.is_authenticated {
            return Ok(None);
        }
        let Some(token) = state.access_token else {
            return Ok(None);
        };

        let user = self.inner.gateway.current_user(&token).await?;
        self.inner.store.set_user(&user)?;
        self.set_state(AuthState::authenticated(user.clone(), token));
        Ok(Some(user))
    }

    /// Check the current access token against the server without touching
    /// local state. `Ok(false)` when unauthenticated.
    pub async fn validate(&self) -> Result<bool, AuthError> {
        match self.state().access_token {
            Some(token) => Ok(self.inner.gateway.validate_token(&token).await?.valid),
            None => Ok(false),
        }
    }

    /// Apply a new snapshot and notify subscribers.
    ///
    /// This is the single mutation point: the snapshot is swapped in under
    /// the lock, then listeners observe the completed state.
    fn set_state(&self, next: AuthState) {
        debug_assert!(next.holds_invariants());
        {
            let mut state = self.inner.state.lock();
            *state = next.clone();
        }
        self.inner.listeners.notify(&next);
    }

    /// Arm the proactive refresh timer for a token valid `validity_secs`
    /// from now. Any existing timer is cancelled first.
    ///
    /// The refresh token is re-read from storage at fire time, so an
    /// intervening sign-out or manual refresh is respected.
    fn schedule_refresh(&self, validity_secs: u64) {
        let delay_secs = validity_secs.saturating_sub(self.inner.config.refresh_threshold_secs);
        self.cancel_refresh_timer();

        debug!(delay_secs, "scheduling proactive refresh");
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let controller = SessionController { inner };

            let Some(refresh_token) = controller.inner.store.get_refresh_token() else {
                debug!("no refresh token at timer fire, skipping scheduled refresh");
                return;
            };
            if let Err(error) = controller.perform_refresh(&refresh_token).await {
                warn!(%error, "scheduled token refresh failed");
            }
        });

        *self.inner.refresh_timer.lock() = Some(handle);
    }

    fn cancel_refresh_timer(&self) {
        if let Some(handle) = self.inner.refresh_timer.lock().take() {
            handle.abort();
        }
    }
}
