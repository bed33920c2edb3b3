//! Remote service ports the saga calls synchronously, with in-memory implementations.

pub mod payment;
pub mod stock;

pub use payment::{InMemoryPaymentService, PaymentService, Transaction};
pub use stock::{InMemoryStockService, StockService};
