use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderChange, OrderStatus};

use crate::Result;

/// Persistence for orders.
///
/// Orders are never deleted. Every status change goes through
/// [`transition`](OrderStore::transition), which compares the current status
/// with the caller's expectation and writes in one atomic step, so two
/// concurrent writers starting from the same status cannot both win.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order.
    ///
    /// Fails with `AlreadyExists` if the id is taken.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Loads an order by id.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Applies `change` if the order is currently in `expected` status.
    ///
    /// Returns the updated order. Fails with `StatusMismatch` if another
    /// writer moved the order first, `NotFound` if there is no such order,
    /// and `InvalidTransition` if `change` cannot follow `expected`.
    async fn transition(
        &self,
        id: OrderId,
        expected: OrderStatus,
        change: OrderChange,
    ) -> Result<Order>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn insert(&self, order: &Order) -> Result<()> {
        (**self).insert(order).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        (**self).get(id).await
    }

    async fn transition(
        &self,
        id: OrderId,
        expected: OrderStatus,
        change: OrderChange,
    ) -> Result<Order> {
        (**self).transition(id, expected, change).await
    }
}

/// Rejects changes the state machine never allows from `expected`.
pub(crate) fn validate_transition(expected: OrderStatus, change: &OrderChange) -> Result<()> {
    let target = change.target_status();
    if !expected.can_transition_to(target) {
        return Err(domain::OrderError::InvalidTransition {
            from: expected,
            to: target,
        }
        .into());
    }
    Ok(())
}
