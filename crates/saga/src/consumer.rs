//! Advances paid orders to ASSEMBLED when the build finishes.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{BuildCompleted, OrderChange, OrderStatus};
use event_bus::{Consumer, EventLog, HandlerError, Message, MessageHandler, ShutdownSignal, Topic};
use order_store::{OrderStore, OrderStoreError};

use crate::metrics::{NoOpOrderMetrics, OrderMetrics};

/// Consumer group the order service reads `order.assembled` with.
pub const ORDER_SERVICE_GROUP: &str = "order-service";

/// What a `BuildCompleted` delivery did to the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The order moved from PAID to ASSEMBLED.
    Assembled,
    /// The order was already ASSEMBLED; redelivery.
    Duplicate,
    /// The order is missing or cannot be assembled; retrying would not help.
    Skipped,
}

/// Handles `BuildCompleted` events for the order service.
///
/// Redelivery is expected, so the handler is idempotent: an order that is
/// already ASSEMBLED is acknowledged without writing.
pub struct BuildCompletedHandler {
    store: Arc<dyn OrderStore>,
    metrics: Arc<dyn OrderMetrics>,
}

impl BuildCompletedHandler {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self {
            store,
            metrics: Arc::new(NoOpOrderMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn OrderMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Applies a build completion to its order.
    ///
    /// Only store failures are errors; they make the bus redeliver.
    #[tracing::instrument(skip_all, fields(order_id = %event.order_id, event_id = %event.event_id))]
    pub async fn apply(&self, event: &BuildCompleted) -> Result<BuildOutcome, HandlerError> {
        let order = match self.store.get(event.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::warn!("build completed for an unknown order, skipping");
                return Ok(BuildOutcome::Skipped);
            }
            Err(e) => return Err(HandlerError::Failed(e.to_string())),
        };

        match order.status {
            OrderStatus::Assembled => {
                tracing::info!("order already assembled, duplicate delivery");
                Ok(BuildOutcome::Duplicate)
            }
            OrderStatus::Paid => self.assemble(event).await,
            status => {
                tracing::warn!(%status, "build completed for an order that cannot be assembled, skipping");
                Ok(BuildOutcome::Skipped)
            }
        }
    }

    async fn assemble(&self, event: &BuildCompleted) -> Result<BuildOutcome, HandlerError> {
        let result = self
            .store
            .transition(event.order_id, OrderStatus::Paid, OrderChange::Assembled)
            .await;

        match result {
            Ok(_) => {
                self.metrics.order_assembled();
                tracing::info!(build_time_sec = event.build_time_sec, "order assembled");
                Ok(BuildOutcome::Assembled)
            }
            Err(OrderStoreError::StatusMismatch {
                actual: OrderStatus::Assembled,
                ..
            }) => {
                tracing::info!("order assembled by a concurrent delivery");
                Ok(BuildOutcome::Duplicate)
            }
            Err(OrderStoreError::StatusMismatch { actual, .. }) => {
                tracing::warn!(status = %actual, "order left PAID before assembly, skipping");
                Ok(BuildOutcome::Skipped)
            }
            Err(OrderStoreError::NotFound(_)) => Ok(BuildOutcome::Skipped),
            Err(e) => Err(HandlerError::Failed(e.to_string())),
        }
    }
}

#[async_trait]
impl MessageHandler for BuildCompletedHandler {
    async fn handle(&self, message: &Message, _shutdown: &ShutdownSignal) -> Result<(), HandlerError> {
        let event = BuildCompleted::from_message(message)?;
        self.apply(&event).await.map(|_| ())
    }
}

/// Wires the handler to `order.assembled` under the order service's group.
pub fn build_completed_consumer<L: EventLog>(log: L, handler: Arc<BuildCompletedHandler>) -> Consumer<L> {
    Consumer::new(log, ORDER_SERVICE_GROUP, Topic::OrderAssembled, handler)
}
