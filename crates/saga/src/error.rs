//! Saga error types.

use std::time::Duration;

use common::{OrderId, PartId};
use domain::OrderStatus;
use order_store::OrderStoreError;
use thiserror::Error;

/// Errors returned by the remote services the saga calls.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request was rejected before processing.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The service processed the request and refused it.
    #[error("Declined: {0}")]
    Declined(String),

    /// The service could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within the configured deadline.
    #[error("Call timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// An order needs at least one part.
    #[error("No parts specified")]
    NoPartsSpecified,

    /// The stock service could not return the part.
    #[error("Part not found: {part_id} ({reason})")]
    PartNotFound { part_id: PartId, reason: String },

    /// The part exists but none are left.
    #[error("Part out of stock: {0}")]
    PartOutOfStock(PartId),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Only orders awaiting payment can be paid.
    #[error("Order {order_id} cannot be paid in status {status}")]
    OrderCannotBePaid {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// Only orders awaiting payment can be cancelled.
    #[error("Order {order_id} cannot be cancelled in status {status}")]
    OrderCannotBeCancelled {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The payment service did not produce a transaction.
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// Order store error.
    #[error("Order store error: {0}")]
    Store(#[from] OrderStoreError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
