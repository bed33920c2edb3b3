//! Notification worker.
//!
//! Two independent consumer groups, one per topic, format order events into
//! messages for the customer and push them through a [`MessagingChannel`].

pub mod channel;
pub mod handlers;
pub mod metrics;
pub mod templates;

pub use channel::{ChannelError, InMemoryChannel, LogChannel, MessagingChannel, TelegramChannel};
pub use handlers::{
    ORDER_ASSEMBLED_GROUP, ORDER_PAID_GROUP, OrderAssembledNotifier, OrderPaidNotifier,
    order_assembled_consumer, order_paid_consumer,
};
pub use metrics::{
    MetricsNotificationMetrics, NoOpNotificationMetrics, NotificationKind, NotificationMetrics,
};
