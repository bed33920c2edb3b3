use chrono::{DateTime, Utc};

use crate::Topic;

/// Position of a record inside a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordPosition {
    pub partition: u32,
    pub offset: u64,
}

/// A record as delivered to a consumer.
#[derive(Debug, Clone)]
pub struct Message {
    /// Topic the record was read from.
    pub topic: Topic,

    /// Partition within the topic.
    pub partition: u32,

    /// Offset within the partition.
    pub offset: u64,

    /// Partitioning key chosen by the producer.
    pub key: String,

    /// Encoded event payload.
    pub payload: Vec<u8>,

    /// When the record was appended to the log.
    pub published_at: DateTime<Utc>,

    /// 1-based delivery attempt within the current consumer.
    pub delivery_attempt: u32,
}

impl Message {
    /// Returns the position of this message.
    pub fn position(&self) -> RecordPosition {
        RecordPosition {
            partition: self.partition,
            offset: self.offset,
        }
    }
}
