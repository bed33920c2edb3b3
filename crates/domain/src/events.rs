//! Integration events exchanged over the bus.
//!
//! Payloads are JSON wrapped in a versioned envelope:
//!
//! ```text
//! {"version": 1, "event": {...}}
//! ```
//!
//! The topic decides which event the envelope carries, so the envelope itself
//! holds no type tag.

use common::{EventId, OrderId, UserId};
use event_bus::{HandlerError, Message, Topic};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::PaymentMethod;

/// Envelope version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors raised while turning a payload back into an event.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON or does not match the event schema.
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The envelope was written by an incompatible producer.
    #[error("Unsupported schema version {0}")]
    UnsupportedVersion(u32),

    /// The topic carries a different event than the caller expected.
    #[error("Topic {topic} does not carry {expected}")]
    UnexpectedEvent {
        topic: Topic,
        expected: &'static str,
    },
}

impl From<DecodeError> for HandlerError {
    fn from(err: DecodeError) -> Self {
        HandlerError::Decode(err.to_string())
    }
}

/// Published on `order.paid` after a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCompleted {
    /// Unique per publish, not per logical payment.
    pub event_id: EventId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub payment_method: PaymentMethod,
    pub transaction_id: Uuid,
}

impl PaymentCompleted {
    pub fn new(
        order_id: OrderId,
        user_id: UserId,
        payment_method: PaymentMethod,
        transaction_id: Uuid,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            user_id,
            payment_method,
            transaction_id,
        }
    }

    /// Decodes the event from a delivered message.
    pub fn from_message(message: &Message) -> Result<Self, DecodeError> {
        match OrderEvent::decode(message.topic, &message.payload)? {
            OrderEvent::PaymentCompleted(event) => Ok(event),
            OrderEvent::BuildCompleted(_) => Err(DecodeError::UnexpectedEvent {
                topic: message.topic,
                expected: "PaymentCompleted",
            }),
        }
    }
}

/// Published on `order.assembled` once the ship has been built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCompleted {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub user_id: UserId,
    /// Build duration in whole seconds.
    pub build_time_sec: u64,
}

impl BuildCompleted {
    pub fn new(order_id: OrderId, user_id: UserId, build_time_sec: u64) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            user_id,
            build_time_sec,
        }
    }

    /// Decodes the event from a delivered message.
    pub fn from_message(message: &Message) -> Result<Self, DecodeError> {
        match OrderEvent::decode(message.topic, &message.payload)? {
            OrderEvent::BuildCompleted(event) => Ok(event),
            OrderEvent::PaymentCompleted(_) => Err(DecodeError::UnexpectedEvent {
                topic: message.topic,
                expected: "BuildCompleted",
            }),
        }
    }
}

/// Every event the order flow puts on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    PaymentCompleted(PaymentCompleted),
    BuildCompleted(BuildCompleted),
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    event: &'a T,
}

#[derive(Deserialize)]
struct RawEnvelope {
    version: u32,
    event: serde_json::Value,
}

impl OrderEvent {
    /// Topic the event is published on.
    pub fn topic(&self) -> Topic {
        match self {
            OrderEvent::PaymentCompleted(_) => Topic::OrderPaid,
            OrderEvent::BuildCompleted(_) => Topic::OrderAssembled,
        }
    }

    /// Partitioning key; events of one order stay ordered.
    pub fn key(&self) -> String {
        self.order_id().to_string()
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::PaymentCompleted(event) => event.order_id,
            OrderEvent::BuildCompleted(event) => event.order_id,
        }
    }

    /// Serializes the event inside the current envelope version.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            OrderEvent::PaymentCompleted(event) => encode_envelope(event),
            OrderEvent::BuildCompleted(event) => encode_envelope(event),
        }
    }

    /// Decodes a payload read from `topic`.
    ///
    /// Dead-letter topics carry the payloads of their primary topic.
    pub fn decode(topic: Topic, payload: &[u8]) -> Result<Self, DecodeError> {
        let envelope: RawEnvelope = serde_json::from_slice(payload)?;
        if envelope.version != SCHEMA_VERSION {
            return Err(DecodeError::UnsupportedVersion(envelope.version));
        }

        let event = match topic {
            Topic::OrderPaid | Topic::OrderPaidDeadLetter => {
                OrderEvent::PaymentCompleted(from_event(envelope.event)?)
            }
            Topic::OrderAssembled | Topic::OrderAssembledDeadLetter => {
                OrderEvent::BuildCompleted(from_event(envelope.event)?)
            }
        };
        Ok(event)
    }
}

impl From<PaymentCompleted> for OrderEvent {
    fn from(event: PaymentCompleted) -> Self {
        OrderEvent::PaymentCompleted(event)
    }
}

impl From<BuildCompleted> for OrderEvent {
    fn from(event: BuildCompleted) -> Self {
        OrderEvent::BuildCompleted(event)
    }
}

fn encode_envelope<T: Serialize>(event: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&EnvelopeRef {
        version: SCHEMA_VERSION,
        event,
    })
}

fn from_event<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, DecodeError> {
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_completed() -> PaymentCompleted {
        PaymentCompleted::new(
            OrderId::new(),
            UserId::from("u1"),
            PaymentMethod::Card,
            Uuid::new_v4(),
        )
    }

    #[test]
    fn test_payment_completed_survives_the_wire() {
        let event = OrderEvent::from(payment_completed());
        let bytes = event.encode().unwrap();

        let decoded = OrderEvent::decode(Topic::OrderPaid, &bytes).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(decoded.topic(), Topic::OrderPaid);
    }

    #[test]
    fn test_envelope_shape() {
        let event = BuildCompleted::new(OrderId::new(), UserId::from("u1"), 7);
        let bytes = OrderEvent::from(event.clone()).encode().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["version"], 1);
        assert_eq!(json["event"]["build_time_sec"], 7);
        assert_eq!(json["event"]["user_id"], "u1");
        assert_eq!(json["event"]["order_id"], event.order_id.to_string());
    }

    #[test]
    fn test_fresh_event_id_per_publish() {
        let order_id = OrderId::new();
        let a = BuildCompleted::new(order_id, UserId::from("u1"), 1);
        let b = BuildCompleted::new(order_id, UserId::from("u1"), 1);
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = OrderEvent::decode(Topic::OrderPaid, b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_wrong_schema_is_malformed() {
        let bytes = OrderEvent::from(BuildCompleted::new(OrderId::new(), UserId::from("u1"), 3))
            .encode()
            .unwrap();
        let err = OrderEvent::decode(Topic::OrderPaid, &bytes).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_future_version_is_rejected() {
        let payload = br#"{"version": 2, "event": {}}"#;
        let err = OrderEvent::decode(Topic::OrderAssembled, payload).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_dead_letter_topic_decodes_primary_payload() {
        let event = OrderEvent::from(payment_completed());
        let bytes = event.encode().unwrap();
        let decoded = OrderEvent::decode(Topic::OrderPaidDeadLetter, &bytes).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_decode_error_becomes_handler_decode_error() {
        let err: HandlerError = DecodeError::UnsupportedVersion(9).into();
        assert!(matches!(err, HandlerError::Decode(msg) if msg.contains('9')));
    }
}
