//! Metrics port for the order saga.

use domain::{Money, PaymentMethod};
use event_bus::Topic;

/// Business counters emitted by the order saga.
pub trait OrderMetrics: Send + Sync {
    fn order_created(&self);
    fn order_paid(&self, method: PaymentMethod, amount: Money);
    fn order_cancelled(&self);
    fn order_assembled(&self);
    /// An event could not be published after its state change was committed.
    fn publish_failed(&self, topic: Topic);
}

/// Exports saga counters through the `metrics` facade.
///
/// - `orders_total{status}`
/// - `orders_revenue_cents_total{payment_method}`
/// - `order_events_publish_failures_total{topic}`
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsOrderMetrics;

impl MetricsOrderMetrics {
    fn count_status(status: &'static str) {
        metrics::counter!("orders_total", "status" => status).increment(1);
    }
}

impl OrderMetrics for MetricsOrderMetrics {
    fn order_created(&self) {
        Self::count_status("created");
    }

    fn order_paid(&self, method: PaymentMethod, amount: Money) {
        Self::count_status("paid");
        metrics::counter!("orders_revenue_cents_total", "payment_method" => method.as_str())
            .increment(amount.cents().max(0) as u64);
    }

    fn order_cancelled(&self) {
        Self::count_status("cancelled");
    }

    fn order_assembled(&self) {
        Self::count_status("assembled");
    }

    fn publish_failed(&self, topic: Topic) {
        metrics::counter!("order_events_publish_failures_total", "topic" => topic.as_str())
            .increment(1);
    }
}

/// Discards all measurements.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpOrderMetrics;

impl OrderMetrics for NoOpOrderMetrics {
    fn order_created(&self) {}
    fn order_paid(&self, _method: PaymentMethod, _amount: Money) {}
    fn order_cancelled(&self) {}
    fn order_assembled(&self) {}
    fn publish_failed(&self, _topic: Topic) {}
}
