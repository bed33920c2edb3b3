//! Metrics port for consumer loops.

use crate::Topic;

/// What happened to a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumeOutcome {
    /// Handled and committed.
    Acked,
    /// Handler failed; the message will be delivered again.
    Retried,
    /// Delivery attempts exhausted; moved to the dead-letter topic.
    DeadLettered,
    /// Shutdown interrupted the handler; left uncommitted.
    Cancelled,
}

impl ConsumeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumeOutcome::Acked => "acked",
            ConsumeOutcome::Retried => "retried",
            ConsumeOutcome::DeadLettered => "dead_lettered",
            ConsumeOutcome::Cancelled => "cancelled",
        }
    }
}

/// Records consumer outcomes without tying the loop to a metrics backend.
pub trait ConsumerMetrics: Send + Sync {
    fn record(&self, topic: Topic, group: &str, outcome: ConsumeOutcome);
}

/// Exports consumer outcomes through the `metrics` facade.
///
/// - `bus_messages_consumed_total{topic, group, outcome}`
/// - `bus_dead_lettered_total{topic, group}`
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsConsumerMetrics;

impl ConsumerMetrics for MetricsConsumerMetrics {
    fn record(&self, topic: Topic, group: &str, outcome: ConsumeOutcome) {
        metrics::counter!(
            "bus_messages_consumed_total",
            "topic" => topic.as_str(),
            "group" => group.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);

        if outcome == ConsumeOutcome::DeadLettered {
            metrics::counter!(
                "bus_dead_lettered_total",
                "topic" => topic.as_str(),
                "group" => group.to_string()
            )
            .increment(1);
        }
    }
}

/// Discards all measurements.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpConsumerMetrics;

impl ConsumerMetrics for NoOpConsumerMetrics {
    fn record(&self, _topic: Topic, _group: &str, _outcome: ConsumeOutcome) {}
}
