//! Order fulfillment saga.
//!
//! This crate coordinates an order across services:
//! 1. Intake: price the parts through the stock service and persist the order
//! 2. Payment: charge through the payment service, mark PAID, publish `order.paid`
//! 3. Assembly: consume `order.assembled` and mark the order ASSEMBLED
//!
//! Stock and payment calls are synchronous and bounded by a deadline; the
//! rest of the flow is event choreography over the bus.

pub mod config;
pub mod consumer;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod services;

pub use config::SagaConfig;
pub use consumer::{BuildCompletedHandler, BuildOutcome, ORDER_SERVICE_GROUP, build_completed_consumer};
pub use error::{Result, SagaError, ServiceError};
pub use metrics::{MetricsOrderMetrics, NoOpOrderMetrics, OrderMetrics};
pub use orchestrator::OrderSaga;
pub use services::{
    InMemoryPaymentService, InMemoryStockService, PaymentService, StockService, Transaction,
};
