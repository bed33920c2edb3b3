//! Consumers that turn order events into customer notifications.
//!
//! Delivery is fire-and-forget: a channel failure is logged and counted and
//! the event is still acknowledged. Only undecodable payloads are errors.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{BuildCompleted, PaymentCompleted};
use event_bus::{Consumer, EventLog, HandlerError, Message, MessageHandler, ShutdownSignal, Topic};

use crate::channel::MessagingChannel;
use crate::metrics::{NoOpNotificationMetrics, NotificationKind, NotificationMetrics};
use crate::templates;

/// Consumer group for `order.paid` notifications.
pub const ORDER_PAID_GROUP: &str = "notification-order-paid";
/// Consumer group for `order.assembled` notifications.
pub const ORDER_ASSEMBLED_GROUP: &str = "notification-order-assembled";

#[derive(Clone)]
struct Delivery {
    channel: Arc<dyn MessagingChannel>,
    metrics: Arc<dyn NotificationMetrics>,
}

impl Delivery {
    async fn send(&self, kind: NotificationKind, text: &str) {
        match self.channel.send(text).await {
            Ok(()) => {
                self.metrics.record(kind, true);
                tracing::info!(kind = kind.as_str(), channel = self.channel.name(), "notification sent");
            }
            Err(e) => {
                self.metrics.record(kind, false);
                tracing::error!(
                    kind = kind.as_str(),
                    channel = self.channel.name(),
                    error = %e,
                    "notification not delivered"
                );
            }
        }
    }
}

/// Tells the customer their order was paid.
pub struct OrderPaidNotifier {
    delivery: Delivery,
}

impl OrderPaidNotifier {
    pub fn new(channel: Arc<dyn MessagingChannel>) -> Self {
        Self {
            delivery: Delivery {
                channel,
                metrics: Arc::new(NoOpNotificationMetrics),
            },
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn NotificationMetrics>) -> Self {
        self.delivery.metrics = metrics;
        self
    }

    #[tracing::instrument(skip_all, fields(order_id = %event.order_id))]
    pub async fn notify(&self, event: &PaymentCompleted) {
        self.delivery
            .send(NotificationKind::OrderPaid, &templates::order_paid(event))
            .await;
    }
}

#[async_trait]
impl MessageHandler for OrderPaidNotifier {
    async fn handle(&self, message: &Message, _shutdown: &ShutdownSignal) -> Result<(), HandlerError> {
        let event = PaymentCompleted::from_message(message)?;
        self.notify(&event).await;
        Ok(())
    }
}

/// Tells the customer their ship is ready.
pub struct OrderAssembledNotifier {
    delivery: Delivery,
}

impl OrderAssembledNotifier {
    pub fn new(channel: Arc<dyn MessagingChannel>) -> Self {
        Self {
            delivery: Delivery {
                channel,
                metrics: Arc::new(NoOpNotificationMetrics),
            },
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn NotificationMetrics>) -> Self {
        self.delivery.metrics = metrics;
        self
    }

    #[tracing::instrument(skip_all, fields(order_id = %event.order_id))]
    pub async fn notify(&self, event: &BuildCompleted) {
        self.delivery
            .send(NotificationKind::OrderAssembled, &templates::order_assembled(event))
            .await;
    }
}

#[async_trait]
impl MessageHandler for OrderAssembledNotifier {
    async fn handle(&self, message: &Message, _shutdown: &ShutdownSignal) -> Result<(), HandlerError> {
        let event = BuildCompleted::from_message(message)?;
        self.notify(&event).await;
        Ok(())
    }
}

pub fn order_paid_consumer<L: EventLog>(log: L, notifier: Arc<OrderPaidNotifier>) -> Consumer<L> {
    Consumer::new(log, ORDER_PAID_GROUP, Topic::OrderPaid, notifier)
}

pub fn order_assembled_consumer<L: EventLog>(
    log: L,
    notifier: Arc<OrderAssembledNotifier>,
) -> Consumer<L> {
    Consumer::new(log, ORDER_ASSEMBLED_GROUP, Topic::OrderAssembled, notifier)
}
