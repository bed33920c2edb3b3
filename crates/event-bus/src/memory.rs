use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::bus::{EventLog, EventPublisher, partition_for_key};
use crate::{BusError, Message, RecordPosition, Result, Topic};

#[derive(Debug, Clone)]
struct StoredRecord {
    key: String,
    payload: Vec<u8>,
    published_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct BusState {
    logs: HashMap<(Topic, u32), Vec<StoredRecord>>,
    offsets: HashMap<(String, Topic, u32), u64>,
    fail_on_publish: bool,
}

/// In-memory partitioned log.
///
/// Mirrors the broker semantics the services rely on: append-only partitions,
/// key-based partitioning, and per-group committed offsets. Clones share the
/// same log, so a producer and its consumers can live in one process.
#[derive(Debug, Clone)]
pub struct InMemoryEventBus {
    partitions: u32,
    state: Arc<RwLock<BusState>>,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(1)
    }
}

impl InMemoryEventBus {
    /// Creates a bus with `partitions` partitions per topic (at least one).
    pub fn new(partitions: u32) -> Self {
        Self {
            partitions: partitions.max(1),
            state: Arc::new(RwLock::new(BusState::default())),
        }
    }

    /// Makes subsequent publishes fail with `BusError::Unavailable`.
    pub async fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().await.fail_on_publish = fail;
    }

    /// Returns every record of a topic, partition by partition.
    pub async fn messages(&self, topic: Topic) -> Vec<Message> {
        let state = self.state.read().await;
        let mut messages = Vec::new();
        for partition in 0..self.partitions {
            if let Some(log) = state.logs.get(&(topic, partition)) {
                messages.extend(
                    log.iter()
                        .enumerate()
                        .map(|(offset, record)| to_message(topic, partition, offset as u64, record)),
                );
            }
        }
        messages
    }

    /// Returns the number of records in a topic.
    pub async fn message_count(&self, topic: Topic) -> usize {
        let state = self.state.read().await;
        (0..self.partitions)
            .filter_map(|partition| state.logs.get(&(topic, partition)))
            .map(Vec::len)
            .sum()
    }

    /// Returns how many records of the topic the group has not committed yet.
    pub async fn lag(&self, group: &str, topic: Topic) -> u64 {
        let state = self.state.read().await;
        (0..self.partitions)
            .map(|partition| {
                let end = state
                    .logs
                    .get(&(topic, partition))
                    .map_or(0, |log| log.len() as u64);
                let committed = state
                    .offsets
                    .get(&(group.to_string(), topic, partition))
                    .copied()
                    .unwrap_or(0);
                end.saturating_sub(committed)
            })
            .sum()
    }

    fn check_partition(&self, topic: Topic, partition: u32) -> Result<()> {
        if partition >= self.partitions {
            return Err(BusError::UnknownPartition { topic, partition });
        }
        Ok(())
    }
}

fn to_message(topic: Topic, partition: u32, offset: u64, record: &StoredRecord) -> Message {
    Message {
        topic,
        partition,
        offset,
        key: record.key.clone(),
        payload: record.payload.clone(),
        published_at: record.published_at,
        delivery_attempt: 1,
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, topic: Topic, key: &str, payload: Vec<u8>) -> Result<RecordPosition> {
        let mut state = self.state.write().await;

        if state.fail_on_publish {
            return Err(BusError::Unavailable("broker is not reachable".to_string()));
        }

        let partition = partition_for_key(key, self.partitions);
        let log = state.logs.entry((topic, partition)).or_default();
        log.push(StoredRecord {
            key: key.to_string(),
            payload,
            published_at: Utc::now(),
        });
        let offset = (log.len() - 1) as u64;

        tracing::debug!(%topic, partition, offset, key, "record appended");

        Ok(RecordPosition { partition, offset })
    }
}

#[async_trait]
impl EventLog for InMemoryEventBus {
    fn partition_count(&self) -> u32 {
        self.partitions
    }

    async fn fetch(&self, topic: Topic, partition: u32, offset: u64) -> Result<Option<Message>> {
        self.check_partition(topic, partition)?;
        let state = self.state.read().await;
        let message = state
            .logs
            .get(&(topic, partition))
            .and_then(|log| log.get(offset as usize))
            .map(|record| to_message(topic, partition, offset, record));
        Ok(message)
    }

    async fn committed_offset(&self, group: &str, topic: Topic, partition: u32) -> Result<u64> {
        self.check_partition(topic, partition)?;
        let state = self.state.read().await;
        Ok(state
            .offsets
            .get(&(group.to_string(), topic, partition))
            .copied()
            .unwrap_or(0))
    }

    async fn commit(
        &self,
        group: &str,
        topic: Topic,
        partition: u32,
        next_offset: u64,
    ) -> Result<()> {
        self.check_partition(topic, partition)?;
        let mut state = self.state.write().await;
        let committed = state
            .offsets
            .entry((group.to_string(), topic, partition))
            .or_insert(0);
        if next_offset < *committed {
            return Err(BusError::OffsetRegression {
                group: group.to_string(),
                topic,
                partition,
                offset: next_offset,
                committed: *committed,
            });
        }
        *committed = next_offset;
        Ok(())
    }
}
