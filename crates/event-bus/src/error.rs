use thiserror::Error;

use crate::Topic;

/// Errors that can occur when interacting with the event bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// The broker could not be reached or refused the write.
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    /// The requested partition does not exist for the topic.
    #[error("Unknown partition {partition} for topic {topic}")]
    UnknownPartition { topic: Topic, partition: u32 },

    /// A committed offset would move a consumer group backwards.
    #[error("Offset {offset} for {group}/{topic}/{partition} is behind committed offset {committed}")]
    OffsetRegression {
        group: String,
        topic: Topic,
        partition: u32,
        offset: u64,
        committed: u64,
    },
}

/// Errors a message handler reports back to the consumer loop.
///
/// Every variant leaves the message unacknowledged. `Cancelled` stops the
/// loop without counting a delivery attempt; the others are retried until
/// the consumer's dead-letter policy kicks in.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload could not be decoded into the expected event.
    #[error("Failed to decode message: {0}")]
    Decode(String),

    /// Processing was interrupted by shutdown.
    #[error("Message processing was cancelled")]
    Cancelled,

    /// Processing failed for a reason that may succeed on retry.
    #[error("Message processing failed: {0}")]
    Failed(String),
}

/// Result type for event bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
