//! Session management module.
//!
//! This module provides:
//! - `SessionController`: the state machine driving the authenticated session
//! - `AuthState`: immutable per-transition state snapshots
//! - `Subscription`: the unsubscribe capability handed to listeners
//!
//! Sessions are restored from the token store at initialization and renewed
//! proactively before their tokens expire.

pub mod controller;
pub mod listeners;
pub mod state;

pub use controller::SessionController;
pub use listeners::Subscription;
pub use state::AuthState;
