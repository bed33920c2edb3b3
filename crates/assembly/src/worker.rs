//! Simulated ship assembly.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{BuildCompleted, OrderEvent, PaymentCompleted};
use event_bus::{
    Consumer, EventLog, EventPublisher, HandlerError, Message, MessageHandler, ShutdownSignal,
    Topic,
};
use rand::Rng;
use tokio::time::Instant;

use crate::config::AssemblyConfig;
use crate::metrics::{AssemblyMetrics, BuildStatus, NoOpAssemblyMetrics};

/// Consumer group the assembly worker reads `order.paid` with.
pub const ASSEMBLY_GROUP: &str = "assembly-service";

/// Builds the ship for each paid order and announces the result.
///
/// Not idempotent: a redelivered `PaymentCompleted` builds again and
/// publishes another `BuildCompleted`. The order service absorbs the
/// duplicate.
pub struct AssemblyHandler {
    publisher: Arc<dyn EventPublisher>,
    config: AssemblyConfig,
    metrics: Arc<dyn AssemblyMetrics>,
}

impl AssemblyHandler {
    pub fn new(publisher: Arc<dyn EventPublisher>, config: AssemblyConfig) -> Self {
        Self {
            publisher,
            config,
            metrics: Arc::new(NoOpAssemblyMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn AssemblyMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn draw_build_units(&self) -> u64 {
        let (low, high) = self.config.unit_bounds();
        rand::rng().random_range(low..=high)
    }

    /// Runs one build for a paid order.
    #[tracing::instrument(skip_all, fields(order_id = %event.order_id, event_id = %event.event_id))]
    pub async fn assemble(
        &self,
        event: PaymentCompleted,
        shutdown: &ShutdownSignal,
    ) -> Result<BuildCompleted, HandlerError> {
        let units = self.draw_build_units();
        let wait = self
            .config
            .time_unit
            .saturating_mul(u32::try_from(units).unwrap_or(u32::MAX));
        let started = Instant::now();

        tracing::info!(build_units = units, "assembly started");

        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            () = shutdown.triggered() => {
                self.metrics.record_build(started.elapsed(), BuildStatus::Error);
                tracing::warn!("assembly interrupted by shutdown, message left for redelivery");
                return Err(HandlerError::Cancelled);
            }
        }

        let build_time_sec = started.elapsed().as_secs();
        let built = BuildCompleted::new(event.order_id, event.user_id, build_time_sec);
        let outcome = OrderEvent::from(built.clone());
        let published = match outcome.encode() {
            Ok(payload) => self
                .publisher
                .publish(Topic::OrderAssembled, &outcome.key(), payload)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match published {
            Ok(position) => {
                self.metrics.record_build(started.elapsed(), BuildStatus::Success);
                tracing::info!(
                    build_time_sec,
                    partition = position.partition,
                    offset = position.offset,
                    "ship assembled"
                );
                Ok(built)
            }
            Err(reason) => {
                self.metrics.record_build(started.elapsed(), BuildStatus::Error);
                tracing::error!(error = %reason, "failed to publish build completion");
                Err(HandlerError::Failed(reason))
            }
        }
    }
}

#[async_trait]
impl MessageHandler for AssemblyHandler {
    async fn handle(&self, message: &Message, shutdown: &ShutdownSignal) -> Result<(), HandlerError> {
        let event = PaymentCompleted::from_message(message)?;
        self.assemble(event, shutdown).await.map(|_| ())
    }
}

/// Wires the handler to `order.paid` under the assembly group.
pub fn assembly_consumer<L: EventLog>(log: L, handler: Arc<AssemblyHandler>) -> Consumer<L> {
    Consumer::new(log, ASSEMBLY_GROUP, Topic::OrderPaid, handler)
}
