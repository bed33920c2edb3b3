//! Background consumers hosted by the process.

use std::sync::Arc;

use assembly::{AssemblyConfig, AssemblyHandler, MetricsAssemblyMetrics, assembly_consumer};
use event_bus::{Consumer, ConsumerConfig, EventLog, MetricsConsumerMetrics, ShutdownSignal};
use notification::{
    MessagingChannel, MetricsNotificationMetrics, OrderAssembledNotifier, OrderPaidNotifier,
    order_assembled_consumer, order_paid_consumer,
};
use order_store::OrderStore;
use saga::{BuildCompletedHandler, MetricsOrderMetrics, build_completed_consumer};
use tokio::task::JoinHandle;

/// What the consumers need besides the bus.
pub struct WorkerDeps {
    pub store: Arc<dyn OrderStore>,
    pub channel: Arc<dyn MessagingChannel>,
    pub assembly: AssemblyConfig,
    pub consumer: ConsumerConfig,
}

/// Running consumer tasks.
pub struct Workers {
    handles: Vec<JoinHandle<()>>,
}

impl Workers {
    /// Starts one task per consumer group: order status updates, assembly
    /// and the two notification groups.
    pub fn spawn<L>(log: L, deps: WorkerDeps, shutdown: &ShutdownSignal) -> Self
    where
        L: EventLog + Clone + 'static,
    {
        let build_completed = BuildCompletedHandler::new(deps.store)
            .with_metrics(Arc::new(MetricsOrderMetrics));
        let assembly = AssemblyHandler::new(Arc::new(log.clone()), deps.assembly)
            .with_metrics(Arc::new(MetricsAssemblyMetrics));
        let paid_notifier = OrderPaidNotifier::new(deps.channel.clone())
            .with_metrics(Arc::new(MetricsNotificationMetrics));
        let assembled_notifier = OrderAssembledNotifier::new(deps.channel)
            .with_metrics(Arc::new(MetricsNotificationMetrics));

        let consumers = [
            build_completed_consumer(log.clone(), Arc::new(build_completed)),
            assembly_consumer(log.clone(), Arc::new(assembly)),
            order_paid_consumer(log.clone(), Arc::new(paid_notifier)),
            order_assembled_consumer(log, Arc::new(assembled_notifier)),
        ];

        let handles = consumers
            .into_iter()
            .map(|consumer| {
                let consumer = consumer
                    .with_config(deps.consumer.clone())
                    .with_metrics(Arc::new(MetricsConsumerMetrics));
                spawn_consumer(consumer, shutdown.clone())
            })
            .collect();

        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every consumer to stop. Call after triggering shutdown.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "consumer task failed");
            }
        }
    }
}

fn spawn_consumer<L: EventLog + 'static>(
    consumer: Consumer<L>,
    shutdown: ShutdownSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(group = consumer.group(), topic = %consumer.topic(), "starting consumer");
        consumer.run(shutdown).await;
    })
}
