//! Metrics port for notifications.

/// Which notification was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    OrderPaid,
    OrderAssembled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderPaid => "order_paid",
            NotificationKind::OrderAssembled => "order_assembled",
        }
    }
}

/// Records notification outcomes without tying handlers to a metrics backend.
pub trait NotificationMetrics: Send + Sync {
    fn record(&self, kind: NotificationKind, delivered: bool);
}

/// Exports notification outcomes through the `metrics` facade.
///
/// - `notifications_total{kind, status}` where status is `sent` or `failed`
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsNotificationMetrics;

impl NotificationMetrics for MetricsNotificationMetrics {
    fn record(&self, kind: NotificationKind, delivered: bool) {
        let status = if delivered { "sent" } else { "failed" };
        metrics::counter!("notifications_total", "kind" => kind.as_str(), "status" => status)
            .increment(1);
    }
}

/// Discards all measurements.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpNotificationMetrics;

impl NotificationMetrics for NoOpNotificationMetrics {
    fn record(&self, _kind: NotificationKind, _delivered: bool) {}
}
