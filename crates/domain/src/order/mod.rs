//! Order model, status machine and value objects.

mod model;
mod state;
mod value_objects;

pub use model::{Order, OrderChange};
pub use state::OrderStatus;
pub use value_objects::{Money, Part, PaymentMethod};

use thiserror::Error;

/// Errors raised by the order model itself.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The state machine does not allow the requested move.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A status name that is not part of the state machine.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    /// A payment method outside the supported set.
    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),
}
