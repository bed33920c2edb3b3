//! Payment service trait and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{Money, PaymentMethod};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ServiceError;

/// Trait for payment processing operations.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges `amount` for an order and returns the transaction id.
    async fn pay_order(
        &self,
        order_id: OrderId,
        user_id: &UserId,
        method: PaymentMethod,
        amount: Money,
    ) -> Result<Uuid, ServiceError>;
}

/// A completed charge as recorded by the payment side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: Uuid,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub payment_method: PaymentMethod,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    transactions: Vec<Transaction>,
    fail_on_charge: bool,
}

/// In-memory payment service for testing and single-process runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to decline every charge.
    pub async fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().await.fail_on_charge = fail;
    }

    /// Returns the number of completed transactions.
    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    /// Returns every transaction recorded for an order.
    pub async fn transactions_for(&self, order_id: OrderId) -> Vec<Transaction> {
        self.state
            .read()
            .await
            .transactions
            .iter()
            .filter(|tx| tx.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn pay_order(
        &self,
        order_id: OrderId,
        user_id: &UserId,
        method: PaymentMethod,
        amount: Money,
    ) -> Result<Uuid, ServiceError> {
        if user_id.as_str().is_empty() {
            return Err(ServiceError::InvalidArgument("user id is required".to_string()));
        }

        let mut state = self.state.write().await;
        if state.fail_on_charge {
            return Err(ServiceError::Declined("payment declined".to_string()));
        }

        let transaction = Transaction {
            id: Uuid::new_v4(),
            order_id,
            user_id: user_id.clone(),
            payment_method: method,
            amount,
            created_at: Utc::now(),
        };
        let id = transaction.id;
        state.transactions.push(transaction);

        tracing::info!(transaction_id = %id, %order_id, %amount, "payment completed");
        Ok(id)
    }
}
