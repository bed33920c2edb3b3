//! Topic names known to the bus.

use serde::{Deserialize, Serialize};

/// Topics carried by the bus.
///
/// The set is closed: producers and consumers agree on these names, and each
/// primary topic has a dead-letter companion for messages that exhausted
/// their delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// `PaymentCompleted` events.
    #[serde(rename = "order.paid")]
    OrderPaid,

    /// `BuildCompleted` events.
    #[serde(rename = "order.assembled")]
    OrderAssembled,

    /// Dead letters from `order.paid`.
    #[serde(rename = "order.paid.dlq")]
    OrderPaidDeadLetter,

    /// Dead letters from `order.assembled`.
    #[serde(rename = "order.assembled.dlq")]
    OrderAssembledDeadLetter,
}

impl Topic {
    /// All topics, primary ones first.
    pub const ALL: [Topic; 4] = [
        Topic::OrderPaid,
        Topic::OrderAssembled,
        Topic::OrderPaidDeadLetter,
        Topic::OrderAssembledDeadLetter,
    ];

    /// Returns the wire name of the topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::OrderPaid => "order.paid",
            Topic::OrderAssembled => "order.assembled",
            Topic::OrderPaidDeadLetter => "order.paid.dlq",
            Topic::OrderAssembledDeadLetter => "order.assembled.dlq",
        }
    }

    /// Returns the dead-letter topic for this topic.
    ///
    /// Dead-letter topics map to themselves so a failing dead-letter consumer
    /// never fans out into new topics.
    pub fn dead_letter(&self) -> Topic {
        match self {
            Topic::OrderPaid | Topic::OrderPaidDeadLetter => Topic::OrderPaidDeadLetter,
            Topic::OrderAssembled | Topic::OrderAssembledDeadLetter => {
                Topic::OrderAssembledDeadLetter
            }
        }
    }

    /// Returns true if this is a dead-letter topic.
    pub fn is_dead_letter(&self) -> bool {
        matches!(
            self,
            Topic::OrderPaidDeadLetter | Topic::OrderAssembledDeadLetter
        )
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| format!("unknown topic: {s}"))
    }
}
