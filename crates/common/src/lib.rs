//! Shared identifier types used across the order fulfillment services.

mod types;

pub use types::{EventId, OrderId, PartId, UserId};
