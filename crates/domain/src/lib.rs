//! Order fulfillment domain.
//!
//! This crate provides:
//! - The `Order` record and its status state machine
//! - Value objects (`Money`, `PaymentMethod`, `Part`)
//! - The integration events exchanged over the bus and their wire envelope

pub mod events;
pub mod order;

pub use events::{BuildCompleted, DecodeError, OrderEvent, PaymentCompleted, SCHEMA_VERSION};
pub use order::{Money, Order, OrderChange, OrderError, OrderStatus, Part, PaymentMethod};
