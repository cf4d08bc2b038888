//! In-process token store.
//!
//! Same contract as the durable variant with no failure modes; used when no
//! persistent capability is available or when volatility is explicitly
//! requested (e.g. ephemeral test sessions).

use parking_lot::Mutex;
use serde_json::Value;

use super::SessionRecord;

#[derive(Debug, Default)]
pub struct VolatileStore {
    record: Mutex<SessionRecord>,
}

impl VolatileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.record.lock().access_token.clone()
    }

    pub fn set_access_token(&self, token: &str) {
        self.record.lock().access_token = Some(token.to_string());
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.record.lock().refresh_token.clone()
    }

    pub fn set_refresh_token(&self, token: &str) {
        self.record.lock().refresh_token = Some(token.to_string());
    }

    pub fn get_token_expiry(&self) -> Option<i64> {
        self.record.lock().token_expiry
    }

    pub fn set_token_expiry(&self, expiry: i64) {
        self.record.lock().token_expiry = Some(expiry);
    }

    pub fn get_user_value(&self) -> Option<Value> {
        self.record.lock().user.clone()
    }

    pub fn set_user_value(&self, user: Value) {
        self.record.lock().user = Some(user);
    }

    pub fn clear(&self) {
        *self.record.lock() = SessionRecord::default();
    }
}
