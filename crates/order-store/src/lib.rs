//! Order persistence.
//!
//! The [`OrderStore`] trait has an in-memory implementation for tests and
//! single-process runs and a PostgreSQL implementation for deployments.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{OrderStoreError, Result};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
