//! Edge authorization gateway.
//!
//! A reverse proxy asks [`AuthGateway::check`] about every inbound request.
//! The gateway reads the session cookie, resolves it to a user through the
//! identity service, and answers with either the identity headers to inject
//! upstream or a denial the proxy returns to the client as-is.

pub mod check;
pub mod cookie;
pub mod http;
pub mod identity;
pub mod metrics;
pub mod session;

pub use check::{
    AuthGateway, AuthVerdict, CheckRequest, CheckResponse, DeniedResponse, HEADER_AUTH_STATUS,
    HEADER_USER_LOGIN, HEADER_USER_UUID, OkResponse,
};
pub use cookie::{SESSION_COOKIE, percent_decode, session_token};
pub use identity::{Identity, IdentityError, IdentityService, SessionIdentityService};
pub use metrics::{AuthMetrics, MetricsAuthMetrics, NoOpAuthMetrics};
pub use session::{InMemorySessionStore, Session, SessionStore, SessionStoreError};
