//! File-backed token store.
//!
//! Persists the session record as JSON under the platform cache directory.
//! Reads fail soft to `None` (an unreadable or corrupt file is treated as an
//! absent session), writes fail loud with a storage-kind error, and `clear`
//! always fails soft.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AuthError;

use super::SessionRecord;

/// Session file name inside the store directory
const SESSION_FILE: &str = "session.json";

/// Directory under the platform cache dir when no override is given
const APP_DIR: &str = "authflow";

#[derive(Debug)]
pub struct DurableStore {
    dir: PathBuf,
}

impl DurableStore {
    /// Open (creating if needed) a store rooted at `dir`, or at the platform
    /// cache directory when no override is given.
    pub fn new(dir: Option<PathBuf>) -> Result<Self, AuthError> {
        let dir = match dir {
            Some(dir) => dir,
            None => dirs::cache_dir()
                .ok_or_else(|| AuthError::Storage("no cache directory available".into()))?
                .join(APP_DIR),
        };

        std::fs::create_dir_all(&dir)
            .map_err(|e| AuthError::Storage(format!("failed to create {}: {}", dir.display(), e)))?;

        Ok(Self { dir })
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Load the current record, treating any read or parse failure as empty.
    fn load(&self) -> SessionRecord {
        let path = self.session_path();
        if !path.exists() {
            return SessionRecord::default();
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read session file");
                return SessionRecord::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse session file");
                SessionRecord::default()
            }
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<(), AuthError> {
        let path = self.session_path();
        let contents = serde_json::to_string_pretty(record)
            .map_err(|e| AuthError::Storage(format!("failed to serialize session: {}", e)))?;
        std::fs::write(&path, contents)
            .map_err(|e| AuthError::Storage(format!("failed to write {}: {}", path.display(), e)))
    }

    fn update(&self, mutate: impl FnOnce(&mut SessionRecord)) -> Result<(), AuthError> {
        let mut record = self.load();
        mutate(&mut record);
        self.save(&record)
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.load().access_token
    }

    pub fn set_access_token(&self, token: &str) -> Result<(), AuthError> {
        self.update(|r| r.access_token = Some(token.to_string()))
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.load().refresh_token
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<(), AuthError> {
        self.update(|r| r.refresh_token = Some(token.to_string()))
    }

    pub fn get_token_expiry(&self) -> Option<i64> {
        self.load().token_expiry
    }

    pub fn set_token_expiry(&self, expiry: i64) -> Result<(), AuthError> {
        self.update(|r| r.token_expiry = Some(expiry))
    }

    pub fn get_user_value(&self) -> Option<Value> {
        self.load().user
    }

    pub fn set_user_value(&self, user: Value) -> Result<(), AuthError> {
        self.update(|r| r.user = Some(user))
    }

    /// Remove the session file. Never fails: a session that cannot be
    /// deleted cleanly is still gone as far as the caller is concerned.
    pub fn clear(&self) {
        let path = self.session_path();
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "session file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove session file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");

        let store = DurableStore::new(Some(dir.path().to_path_buf())).expect("store");
        store.set_access_token("a1").expect("write");
        store.set_token_expiry(1_700_000_000).expect("write");
        store
            .set_user_value(json!({"uid": "u-1", "email": "a@b.c"}))
            .expect("write");

        let reopened = DurableStore::new(Some(dir.path().to_path_buf())).expect("store");
        assert_eq!(reopened.get_access_token().as_deref(), Some("a1"));
        assert_eq!(reopened.get_token_expiry(), Some(1_700_000_000));
        assert_eq!(reopened.get_user_value().unwrap()["uid"], "u-1");
        // Never written, tolerated as absent
        assert!(reopened.get_refresh_token().is_none());
    }

    #[test]
    fn test_corrupt_file_reads_fail_soft() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(SESSION_FILE), "{not json").expect("write");

        let store = DurableStore::new(Some(dir.path().to_path_buf())).expect("store");
        assert!(store.get_access_token().is_none());
        assert!(store.get_token_expiry().is_none());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DurableStore::new(Some(dir.path().to_path_buf())).expect("store");

        store.set_access_token("a1").expect("write");
        store.clear();
        assert!(store.get_access_token().is_none());

        // Clearing an already-empty store must not fail
        store.clear();
    }

    #[test]
    fn test_partial_record_tolerated() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(SESSION_FILE),
            r#"{"access_token": "a1"}"#,
        )
        .expect("write");

        let store = DurableStore::new(Some(dir.path().to_path_buf())).expect("store");
        assert_eq!(store.get_access_token().as_deref(), Some("a1"));
        assert!(store.get_user_value().is_none());
        assert!(store.get_token_expiry().is_none());
    }
}
