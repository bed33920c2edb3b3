//! Catalogue and sessions loaded at startup.
//!
//! Stock and login live outside this service; until they are wired in, the
//! in-memory stand-ins are seeded so the API can be exercised end to end.

use chrono::Duration;
use domain::{Money, Part};
use gateway::{InMemorySessionStore, Session};
use saga::InMemoryStockService;

/// Session id accepted by the gateway for the demo user.
pub const DEMO_SESSION_ID: &str = "sess-123";
pub const DEMO_USER_ID: &str = "u1";
pub const DEMO_USER_LOGIN: &str = "alice";

/// Parts available for ordering: `(id, name, price in cents, stock)`.
pub const DEMO_PARTS: [(&str, &str, i64, i64); 4] = [
    ("4d3c1b2a-0000-4000-8000-000000000001", "Main engine", 100, 50),
    ("4d3c1b2a-0000-4000-8000-000000000002", "Hull section", 200, 20),
    ("4d3c1b2a-0000-4000-8000-000000000003", "Porthole", 35, 100),
    ("4d3c1b2a-0000-4000-8000-000000000004", "Fuel tank", 80, 0),
];

pub async fn seed_parts(stock: &InMemoryStockService) {
    for (id, name, cents, quantity) in DEMO_PARTS {
        stock
            .upsert_part(Part::new(id, name, Money::from_cents(cents), quantity))
            .await;
    }
    tracing::info!(parts = DEMO_PARTS.len(), "demo parts seeded");
}

pub async fn seed_sessions(sessions: &InMemorySessionStore) {
    sessions
        .insert(
            DEMO_SESSION_ID,
            Session::valid_for(DEMO_USER_ID, DEMO_USER_LOGIN, Duration::days(1)),
        )
        .await;
    tracing::info!(login = DEMO_USER_LOGIN, "demo session seeded");
}
