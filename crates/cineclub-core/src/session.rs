//! Durable session state: bearer tokens plus the logged-in username.
//!
//! The store is the single writer for session state. Clones share the
//! in-memory copy, and every mutation is persisted to `session.json` in
//! the data dir so a session survives process restarts.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CoreError;
use crate::paths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Short-lived JWT access token.
    pub access: String,
    /// Long-lived refresh token for obtaining new access tokens.
    pub refresh: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone)]
pub struct SessionStore {
    path: PathBuf,
    current: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    /// Open the store at the default session path.
    pub fn open() -> Result<Self, CoreError> {
        Self::at(paths::session_path()?)
    }

    /// Open the store backed by an explicit file (tests use a tempdir).
    pub fn at(path: PathBuf) -> Result<Self, CoreError> {
        let current = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Session>(&bytes) {
                Ok(session) => Some(session),
                Err(e) => {
                    // Corrupt session file means logged out, not a hard error.
                    warn!("session file unreadable, treating as logged out: {e}");
                    None
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            current: Arc::new(RwLock::new(current)),
        })
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.access.clone())
    }

    pub fn username(&self) -> Option<String> {
        self.current.read().as_ref().and_then(|s| s.username.clone())
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn set(&self, session: Session) -> Result<(), CoreError> {
        self.persist(&session)?;
        *self.current.write() = Some(session);
        Ok(())
    }

    /// Rotate only the access token (token refresh path). Concurrent
    /// rotations are last-write-wins; tokens are idempotent strings.
    pub fn set_access(&self, access: String) -> Result<(), CoreError> {
        let mut guard = self.current.write();
        match guard.as_mut() {
            Some(session) => {
                // Persist first, like `set`; a failed write must not
                // leave memory ahead of the file.
                let mut updated = session.clone();
                updated.access = access;
                self.persist(&updated)?;
                *session = updated;
                Ok(())
            }
            None => {
                warn!("access token rotation with no active session");
                Ok(())
            }
        }
    }

    pub fn set_username(&self, username: String) -> Result<(), CoreError> {
        let mut guard = self.current.write();
        match guard.as_mut() {
            Some(session) => {
                let mut updated = session.clone();
                updated.username = Some(username);
                self.persist(&updated)?;
                *session = updated;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Drop the session and remove the backing file.
    pub fn clear(&self) -> Result<(), CoreError> {
        *self.current.write() = None;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, session: &Session) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session() -> Session {
        Session {
            access: "acc".into(),
            refresh: "ref".into(),
            username: Some("alice".into()),
        }
    }

    #[test]
    fn set_persists_and_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::at(path.clone()).unwrap();
        assert!(store.current().is_none());
        store.set(session()).unwrap();

        let reopened = SessionStore::at(path).unwrap();
        assert_eq!(reopened.current(), Some(session()));
        assert_eq!(reopened.username().as_deref(), Some("alice"));
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::at(path.clone()).unwrap();
        store.set(session()).unwrap();
        store.clear().unwrap();
        assert!(store.current().is_none());
        assert!(!path.exists());

        // Clearing an already-cleared store is fine.
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_means_logged_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = SessionStore::at(path).unwrap();
        assert!(store.current().is_none());
    }

    #[test]
    fn access_rotation_keeps_refresh_token() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::at(path.clone()).unwrap();
        store.set(session()).unwrap();
        store.set_access("acc2".into()).unwrap();

        let reopened = SessionStore::at(path).unwrap();
        let current = reopened.current().unwrap();
        assert_eq!(current.access, "acc2");
        assert_eq!(current.refresh, "ref");
    }

    #[test]
    fn failed_persist_leaves_memory_unchanged() {
        let dir = tempdir().unwrap();
        let parent = dir.path().join("store");
        let path = parent.join("session.json");

        let store = SessionStore::at(path.clone()).unwrap();
        store.set(session()).unwrap();

        // Replace the store directory with a plain file so the next
        // persist cannot create it.
        fs::remove_file(&path).unwrap();
        fs::remove_dir(&parent).unwrap();
        fs::write(&parent, b"blocker").unwrap();

        assert!(store.set_access("acc2".into()).is_err());
        assert_eq!(store.current().unwrap().access, "acc");

        assert!(store.set_username("mallory".into()).is_err());
        assert_eq!(store.current().unwrap().username.as_deref(), Some("alice"));
    }

    #[test]
    fn rotation_without_session_is_noop() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json")).unwrap();
        store.set_access("acc".into()).unwrap();
        assert!(store.current().is_none());
    }

    #[test]
    fn clones_share_state() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json")).unwrap();
        let other = store.clone();
        store.set(session()).unwrap();
        assert!(other.is_logged_in());
    }
}
