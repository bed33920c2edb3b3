//! Identity lookup: session id to user.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::UserId;
use thiserror::Error;

use crate::session::{SessionStore, SessionStoreError};

/// Who a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub login: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Session expired")]
    SessionExpired,

    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

/// The `Whoami` call the gateway makes for every request carrying a session.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn whoami(&self, session_id: &str) -> Result<Identity, IdentityError>;
}

/// Resolves identities straight from a [`SessionStore`].
pub struct SessionIdentityService {
    sessions: Arc<dyn SessionStore>,
}

impl SessionIdentityService {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl IdentityService for SessionIdentityService {
    async fn whoami(&self, session_id: &str) -> Result<Identity, IdentityError> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(IdentityError::SessionNotFound)?;

        if session.is_expired_at(Utc::now()) {
            return Err(IdentityError::SessionExpired);
        }

        Ok(Identity {
            user_id: session.user_id,
            login: session.login,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::session::{InMemorySessionStore, Session};

    async fn service() -> (SessionIdentityService, InMemorySessionStore) {
        let store = InMemorySessionStore::new();
        store
            .insert("live", Session::valid_for("u1", "alice", Duration::hours(1)))
            .await;
        store
            .insert("stale", Session::valid_for("u2", "bob", Duration::hours(-1)))
            .await;
        (SessionIdentityService::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_whoami_live_session() {
        let (service, _) = service().await;
        let identity = service.whoami("live").await.unwrap();
        assert_eq!(identity.user_id, UserId::from("u1"));
        assert_eq!(identity.login, "alice");
    }

    #[tokio::test]
    async fn test_whoami_unknown_session() {
        let (service, _) = service().await;
        let err = service.whoami("nope").await.unwrap_err();
        assert!(matches!(err, IdentityError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_whoami_expired_session() {
        let (service, _) = service().await;
        let err = service.whoami("stale").await.unwrap_err();
        assert!(matches!(err, IdentityError::SessionExpired));
    }

    #[tokio::test]
    async fn test_whoami_store_failure() {
        let (service, store) = service().await;
        store.set_fail_on_read(true).await;
        let err = service.whoami("live").await.unwrap_err();
        assert!(matches!(err, IdentityError::Store(_)));
    }
}
