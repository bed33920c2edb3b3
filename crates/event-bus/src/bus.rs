use std::sync::Arc;

use async_trait::async_trait;

use crate::{Message, RecordPosition, Result, Topic};

/// Producer side of the bus.
///
/// Publishing appends the payload to one partition of the topic, chosen by
/// the key, so records sharing a key keep their relative order.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Appends a record and returns where it landed.
    async fn publish(&self, topic: Topic, key: &str, payload: Vec<u8>) -> Result<RecordPosition>;
}

/// Read side of the bus used by consumer groups.
///
/// Delivery is at-least-once: a record stays available to a group until the
/// group commits an offset past it, and nothing prevents it from being read
/// again before that commit happens.
#[async_trait]
pub trait EventLog: EventPublisher {
    /// Number of partitions per topic.
    fn partition_count(&self) -> u32;

    /// Reads the record at `offset`, if one has been appended.
    async fn fetch(&self, topic: Topic, partition: u32, offset: u64) -> Result<Option<Message>>;

    /// Returns the next offset the group should read.
    async fn committed_offset(&self, group: &str, topic: Topic, partition: u32) -> Result<u64>;

    /// Records that the group has processed everything before `next_offset`.
    async fn commit(&self, group: &str, topic: Topic, partition: u32, next_offset: u64)
    -> Result<()>;
}

#[async_trait]
impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    async fn publish(&self, topic: Topic, key: &str, payload: Vec<u8>) -> Result<RecordPosition> {
        (**self).publish(topic, key, payload).await
    }
}

#[async_trait]
impl<T: EventLog + ?Sized> EventLog for Arc<T> {
    fn partition_count(&self) -> u32 {
        (**self).partition_count()
    }

    async fn fetch(&self, topic: Topic, partition: u32, offset: u64) -> Result<Option<Message>> {
        (**self).fetch(topic, partition, offset).await
    }

    async fn committed_offset(&self, group: &str, topic: Topic, partition: u32) -> Result<u64> {
        (**self).committed_offset(group, topic, partition).await
    }

    async fn commit(
        &self,
        group: &str,
        topic: Topic,
        partition: u32,
        next_offset: u64,
    ) -> Result<()> {
        (**self).commit(group, topic, partition, next_offset).await
    }
}

/// Maps a key onto a partition.
///
/// FNV-1a keeps the mapping stable across processes and releases.
pub fn partition_for_key(key: &str, partitions: u32) -> u32 {
    if partitions <= 1 {
        return 0;
    }
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % u64::from(partitions)) as u32
}
