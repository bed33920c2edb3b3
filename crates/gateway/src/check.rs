//! The check-request/check-response protocol of an external authorization
//! filter.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cookie::session_token;
use crate::identity::{Identity, IdentityService};
use crate::metrics::{AuthMetrics, NoOpAuthMetrics};

pub const HEADER_USER_UUID: &str = "x-user-uuid";
pub const HEADER_USER_LOGIN: &str = "x-user-login";
pub const HEADER_AUTH_STATUS: &str = "x-auth-status";

const HEADER_COOKIE: &str = "cookie";
const HEADER_AUTHORIZATION: &str = "authorization";
const DENIED_MESSAGE: &str = "Missing or invalid session";

/// The inbound request as the proxy describes it.
///
/// Header names are stored lowercased. A repeated header keeps every value:
/// cookies are joined with `"; "`, anything else with `", "`.
#[derive(Debug, Clone, Default)]
pub struct CheckRequest {
    headers: HashMap<String, String>,
}

impl CheckRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_headers<K, V>(headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut request = Self::new();
        for (name, value) in headers {
            request = request.with_header(name.as_ref(), value);
        }
        request
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.headers.get_mut(&name) {
            Some(existing) => {
                existing.push_str(if name == HEADER_COOKIE { "; " } else { ", " });
                existing.push_str(&value);
            }
            None => {
                self.headers.insert(name, value);
            }
        }
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Let the request through, rewriting its headers on the way upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkResponse {
    pub headers_to_add: Vec<(String, String)>,
    pub headers_to_remove: Vec<String>,
}

/// Answer the client directly instead of forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeniedResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResponse {
    Ok(OkResponse),
    Denied(DeniedResponse),
}

impl CheckResponse {
    fn allow(identity: Identity) -> Self {
        CheckResponse::Ok(OkResponse {
            headers_to_add: vec![
                (HEADER_USER_UUID.to_string(), identity.user_id.to_string()),
                (HEADER_USER_LOGIN.to_string(), identity.login),
            ],
            headers_to_remove: vec![HEADER_COOKIE.to_string(), HEADER_AUTHORIZATION.to_string()],
        })
    }

    fn deny() -> Self {
        CheckResponse::Denied(DeniedResponse {
            status: 403,
            body: serde_json::json!({ "error": DENIED_MESSAGE }).to_string(),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                (HEADER_AUTH_STATUS.to_string(), "denied".to_string()),
            ],
        })
    }

    pub fn verdict(&self) -> AuthVerdict {
        match self {
            CheckResponse::Ok(_) => AuthVerdict::Allowed,
            CheckResponse::Denied(_) => AuthVerdict::Denied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVerdict {
    Allowed,
    Denied,
}

impl AuthVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthVerdict::Allowed => "allowed",
            AuthVerdict::Denied => "denied",
        }
    }
}

/// Decides whether an inbound request may proceed.
///
/// Every failure collapses into the same 403 so callers cannot tell a
/// malformed cookie from an unknown or expired session. The reason is only
/// logged.
pub struct AuthGateway {
    identity: Arc<dyn IdentityService>,
    metrics: Arc<dyn AuthMetrics>,
}

impl AuthGateway {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self {
            identity,
            metrics: Arc::new(NoOpAuthMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn AuthMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    #[tracing::instrument(skip_all)]
    pub async fn check(&self, request: &CheckRequest) -> CheckResponse {
        let response = self.decide(request).await;
        self.metrics.record(response.verdict());
        response
    }

    async fn decide(&self, request: &CheckRequest) -> CheckResponse {
        let Some(token) = request.header(HEADER_COOKIE).and_then(session_token) else {
            tracing::info!("denied: no session cookie");
            return CheckResponse::deny();
        };

        match self.identity.whoami(&token).await {
            Ok(identity) => {
                tracing::debug!(user_id = %identity.user_id, "allowed");
                CheckResponse::allow(identity)
            }
            Err(e) => {
                tracing::info!(error = %e, "denied: whoami failed");
                CheckResponse::deny()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::identity::SessionIdentityService;
    use crate::session::{InMemorySessionStore, Session};

    async fn gateway() -> AuthGateway {
        let store = InMemorySessionStore::new();
        store
            .insert("sess-123", Session::valid_for("u1", "alice", Duration::hours(1)))
            .await;
        AuthGateway::new(Arc::new(SessionIdentityService::new(Arc::new(store))))
    }

    fn assert_denied(response: &CheckResponse) {
        let CheckResponse::Denied(denied) = response else {
            panic!("expected denial, got {response:?}");
        };
        assert_eq!(denied.status, 403);
        assert_eq!(denied.body, r#"{"error":"Missing or invalid session"}"#);
        assert!(
            denied
                .headers
                .contains(&("x-auth-status".to_string(), "denied".to_string()))
        );
        assert!(
            denied
                .headers
                .contains(&("content-type".to_string(), "application/json".to_string()))
        );
    }

    #[tokio::test]
    async fn test_no_cookie_header_denied() {
        let response = gateway().await.check(&CheckRequest::new()).await;
        assert_denied(&response);
    }

    #[tokio::test]
    async fn test_cookie_without_session_denied() {
        let request = CheckRequest::new().with_header("cookie", "theme=dark");
        assert_denied(&gateway().await.check(&request).await);
    }

    #[tokio::test]
    async fn test_unknown_session_denied_the_same_way() {
        let request = CheckRequest::new().with_header("Cookie", "X-Session-Uuid=sess-999");
        assert_denied(&gateway().await.check(&request).await);
    }

    #[tokio::test]
    async fn test_valid_session_allowed() {
        let request = CheckRequest::from_headers([
            ("Cookie", "X-Session-Uuid=sess-123"),
            ("Authorization", "Bearer abc"),
        ]);

        let response = gateway().await.check(&request).await;

        assert_eq!(
            response,
            CheckResponse::Ok(OkResponse {
                headers_to_add: vec![
                    ("x-user-uuid".to_string(), "u1".to_string()),
                    ("x-user-login".to_string(), "alice".to_string()),
                ],
                headers_to_remove: vec!["cookie".to_string(), "authorization".to_string()],
            })
        );
        assert_eq!(response.verdict(), AuthVerdict::Allowed);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = CheckRequest::new().with_header("X-Custom", "1");
        assert_eq!(request.header("x-custom"), Some("1"));
        assert_eq!(request.header("X-CUSTOM"), Some("1"));
        assert_eq!(request.header("other"), None);
    }

    #[test]
    fn test_repeated_headers_are_combined() {
        let request = CheckRequest::from_headers([
            ("Cookie", "theme=dark"),
            ("cookie", "lang=en"),
            ("Accept", "text/html"),
            ("accept", "application/json"),
        ]);
        assert_eq!(request.header("cookie"), Some("theme=dark; lang=en"));
        assert_eq!(request.header("accept"), Some("text/html, application/json"));
    }

    #[tokio::test]
    async fn test_session_in_second_cookie_header_allowed() {
        let request = CheckRequest::new()
            .with_header("cookie", "theme=dark")
            .with_header("cookie", "X-Session-Uuid=sess-123");

        let response = gateway().await.check(&request).await;

        assert_eq!(response.verdict(), AuthVerdict::Allowed);
    }
}
