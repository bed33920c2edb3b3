//! Session records consulted by the identity service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::UserId;
use thiserror::Error;
use tokio::sync::RwLock;

/// A logged-in session. Created at login, never mutated by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub login: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>, login: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            login: login.into(),
            expires_at,
        }
    }

    /// A session valid for `ttl` from now.
    pub fn valid_for(user_id: impl Into<UserId>, login: impl Into<String>, ttl: Duration) -> Self {
        Self::new(user_id, login, Utc::now() + ttl)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value lookup from session id to session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionStoreError>;
}

#[derive(Debug, Default)]
struct SessionState {
    sessions: HashMap<String, Session>,
    fail_on_read: bool,
}

/// Session store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    state: Arc<RwLock<SessionState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session_id: impl Into<String>, session: Session) {
        self.state
            .write()
            .await
            .sessions
            .insert(session_id.into(), session);
    }

    pub async fn remove(&self, session_id: &str) -> Option<Session> {
        self.state.write().await.sessions.remove(session_id)
    }

    /// Makes subsequent lookups fail with `SessionStoreError::Unavailable`.
    pub async fn set_fail_on_read(&self, fail: bool) {
        self.state.write().await.fail_on_read = fail;
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionStoreError> {
        let state = self.state.read().await;
        if state.fail_on_read {
            return Err(SessionStoreError::Unavailable("store is not reachable".to_string()));
        }
        Ok(state.sessions.get(session_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemorySessionStore::new();
        store
            .insert("sess-1", Session::valid_for("u1", "alice", Duration::hours(1)))
            .await;

        let session = store.get("sess-1").await.unwrap().unwrap();
        assert_eq!(session.login, "alice");
        assert!(store.get("sess-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemorySessionStore::new();
        store
            .insert("sess-1", Session::valid_for("u1", "alice", Duration::hours(1)))
            .await;
        assert!(store.remove("sess-1").await.is_some());
        assert!(store.get("sess-1").await.unwrap().is_none());
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let session = Session::new("u1", "alice", now);
        assert!(session.is_expired_at(now));
        assert!(!session.is_expired_at(now - Duration::seconds(1)));
    }
}
