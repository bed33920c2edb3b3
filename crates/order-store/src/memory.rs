use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderChange, OrderStatus};
use tokio::sync::RwLock;

use crate::store::{OrderStore, validate_transition};
use crate::{OrderStoreError, Result};

#[derive(Debug, Default)]
struct StoreState {
    orders: HashMap<OrderId, Order>,
    fail_on_read: bool,
    fail_on_write: bool,
}

/// In-memory order store.
///
/// The write lock makes the compare-and-set in `transition` atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Makes subsequent reads fail with `Unavailable`.
    pub async fn set_fail_on_read(&self, fail: bool) {
        self.state.write().await.fail_on_read = fail;
    }

    /// Makes subsequent writes fail with `Unavailable`.
    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_on_write = fail;
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_write {
            return Err(OrderStoreError::Unavailable("write refused".to_string()));
        }
        if state.orders.contains_key(&order.id) {
            return Err(OrderStoreError::AlreadyExists(order.id));
        }

        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;

        if state.fail_on_read {
            return Err(OrderStoreError::Unavailable("read refused".to_string()));
        }
        Ok(state.orders.get(&id).cloned())
    }

    async fn transition(
        &self,
        id: OrderId,
        expected: OrderStatus,
        change: OrderChange,
    ) -> Result<Order> {
        validate_transition(expected, &change)?;

        let mut state = self.state.write().await;
        if state.fail_on_write {
            return Err(OrderStoreError::Unavailable("write refused".to_string()));
        }

        let order = state
            .orders
            .get_mut(&id)
            .ok_or(OrderStoreError::NotFound(id))?;

        if order.status != expected {
            return Err(OrderStoreError::StatusMismatch {
                order_id: id,
                expected,
                actual: order.status,
            });
        }

        order.apply(&change)?;
        Ok(order.clone())
    }
}
