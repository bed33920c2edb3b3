//! The order record and the changes that advance it.

use chrono::{DateTime, Utc};
use common::{OrderId, PartId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Money, OrderError, OrderStatus, PaymentMethod};

/// A customer order for a set of ship parts.
///
/// `transaction_id` is present exactly when the order has been paid. Status
/// only moves forward; see [`OrderStatus`] for the allowed transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub part_ids: Vec<PartId>,
    pub total_price: Money,
    pub payment_method: Option<PaymentMethod>,
    pub transaction_id: Option<Uuid>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order awaiting payment.
    pub fn new(
        user_id: UserId,
        part_ids: Vec<PartId>,
        total_price: Money,
        payment_method: Option<PaymentMethod>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            user_id,
            part_ids,
            total_price,
            payment_method,
            transaction_id: None,
            status: OrderStatus::PendingPayment,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a status change, rejecting moves the state machine forbids.
    pub fn apply(&mut self, change: &OrderChange) -> Result<(), OrderError> {
        let next = change.target_status();
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        if let OrderChange::Paid {
            transaction_id,
            payment_method,
        } = change
        {
            self.transaction_id = Some(*transaction_id);
            self.payment_method = Some(*payment_method);
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A forward move of an order's status, with the data it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderChange {
    /// Payment succeeded.
    Paid {
        transaction_id: Uuid,
        payment_method: PaymentMethod,
    },
    /// The ship was built.
    Assembled,
    /// The customer gave up before paying.
    Cancelled,
}

impl OrderChange {
    /// Status the order ends up in after this change.
    pub fn target_status(&self) -> OrderStatus {
        match self {
            OrderChange::Paid { .. } => OrderStatus::Paid,
            OrderChange::Assembled => OrderStatus::Assembled,
            OrderChange::Cancelled => OrderStatus::Cancelled,
        }
    }
}
