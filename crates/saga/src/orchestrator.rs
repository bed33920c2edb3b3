//! The order saga: intake, payment and cancellation.

use std::future::Future;
use std::sync::Arc;

use common::{OrderId, PartId, UserId};
use domain::{
    Money, Order, OrderChange, OrderEvent, OrderStatus, PaymentCompleted, PaymentMethod,
};
use event_bus::EventPublisher;
use order_store::{OrderStore, OrderStoreError};
use uuid::Uuid;

use crate::config::SagaConfig;
use crate::error::{Result, SagaError, ServiceError};
use crate::metrics::{NoOpOrderMetrics, OrderMetrics};
use crate::services::{PaymentService, StockService};

/// Drives an order from intake through payment.
///
/// Stock and payment are called synchronously; everything after payment
/// happens through events. The `PaymentCompleted` event is published after
/// the order is committed as PAID and a publish failure does not undo the
/// payment, so consumers may lag behind the store until the event is
/// re-published by an operator.
pub struct OrderSaga {
    store: Arc<dyn OrderStore>,
    stock: Arc<dyn StockService>,
    payment: Arc<dyn PaymentService>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<dyn OrderMetrics>,
    config: SagaConfig,
}

impl OrderSaga {
    /// Creates a saga with default config and no metrics.
    pub fn new(
        store: Arc<dyn OrderStore>,
        stock: Arc<dyn StockService>,
        payment: Arc<dyn PaymentService>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            stock,
            payment,
            publisher,
            metrics: Arc::new(NoOpOrderMetrics),
            config: SagaConfig::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn OrderMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_config(mut self, config: SagaConfig) -> Self {
        self.config = config;
        self
    }

    /// Prices the parts and persists a new order awaiting payment.
    ///
    /// Nothing is persisted unless every part exists and is in stock.
    #[tracing::instrument(skip_all, fields(user_id = %user_id, parts = part_ids.len()))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        part_ids: Vec<PartId>,
        payment_method: Option<PaymentMethod>,
    ) -> Result<Order> {
        if part_ids.is_empty() {
            return Err(SagaError::NoPartsSpecified);
        }

        let mut total = Money::zero();
        for part_id in &part_ids {
            let part = self
                .call(self.stock.get_part(part_id))
                .await
                .map_err(|e| SagaError::PartNotFound {
                    part_id: part_id.clone(),
                    reason: e.to_string(),
                })?;

            if !part.in_stock() {
                return Err(SagaError::PartOutOfStock(part_id.clone()));
            }
            total += part.price;
        }

        let order = Order::new(user_id, part_ids, total, payment_method);
        self.store.insert(&order).await?;
        self.metrics.order_created();

        tracing::info!(order_id = %order.id, total_price = %order.total_price, "order created");
        Ok(order)
    }

    /// Charges the order and marks it PAID.
    ///
    /// Returns the payment transaction id.
    #[tracing::instrument(skip_all, fields(order_id = %order_id, payment_method = %payment_method))]
    pub async fn pay_order(&self, order_id: OrderId, payment_method: PaymentMethod) -> Result<Uuid> {
        let order = self.get_order(order_id).await?;
        if !order.status.can_pay() {
            return Err(SagaError::OrderCannotBePaid {
                order_id,
                status: order.status,
            });
        }

        let transaction_id = self
            .call(self.payment.pay_order(
                order.id,
                &order.user_id,
                payment_method,
                order.total_price,
            ))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "payment failed");
                SagaError::PaymentFailed(e.to_string())
            })?;

        let change = OrderChange::Paid {
            transaction_id,
            payment_method,
        };
        let paid = self
            .store
            .transition(order_id, OrderStatus::PendingPayment, change)
            .await
            .map_err(|e| match e {
                OrderStoreError::StatusMismatch { actual, .. } => {
                    tracing::error!(
                        %transaction_id,
                        status = %actual,
                        "order changed while payment was in flight; charge needs manual refund"
                    );
                    SagaError::OrderCannotBePaid {
                        order_id,
                        status: actual,
                    }
                }
                OrderStoreError::NotFound(_) => SagaError::OrderNotFound(order_id),
                other => other.into(),
            })?;

        self.metrics.order_paid(payment_method, paid.total_price);
        tracing::info!(%transaction_id, "order paid");

        let event = PaymentCompleted::new(paid.id, paid.user_id, payment_method, transaction_id);
        self.publish(event.into()).await;

        Ok(transaction_id)
    }

    /// Cancels an order that has not been paid yet.
    #[tracing::instrument(skip_all, fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<()> {
        let result = self
            .store
            .transition(order_id, OrderStatus::PendingPayment, OrderChange::Cancelled)
            .await;

        match result {
            Ok(_) => {
                self.metrics.order_cancelled();
                tracing::info!("order cancelled");
                Ok(())
            }
            Err(OrderStoreError::NotFound(_)) => Err(SagaError::OrderNotFound(order_id)),
            Err(OrderStoreError::StatusMismatch { actual, .. }) => {
                Err(SagaError::OrderCannotBeCancelled {
                    order_id,
                    status: actual,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Loads an order.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get(order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(order_id))
    }

    async fn call<T>(
        &self,
        request: impl Future<Output = std::result::Result<T, ServiceError>>,
    ) -> std::result::Result<T, ServiceError> {
        let deadline = self.config.rpc_timeout;
        tokio::time::timeout(deadline, request)
            .await
            .map_err(|_| ServiceError::Timeout(deadline))?
    }

    async fn publish(&self, event: OrderEvent) {
        let topic = event.topic();
        let result = match event.encode() {
            Ok(payload) => self
                .publisher
                .publish(topic, &event.key(), payload)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        if let Err(reason) = result {
            self.metrics.publish_failed(topic);
            tracing::error!(
                %topic,
                order_id = %event.order_id(),
                error = %reason,
                "event not published; order state is already committed"
            );
        }
    }
}
