//! Consumer-group loop with at-least-once semantics.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::bus::EventLog;
use crate::metrics::{ConsumeOutcome, ConsumerMetrics, NoOpConsumerMetrics};
use crate::shutdown::ShutdownSignal;
use crate::{HandlerError, Message, Result, Topic};

/// Handles messages delivered to a consumer group.
///
/// Returning `Ok` acknowledges the message. Any error leaves it
/// uncommitted, so handlers must tolerate seeing a message more than once.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message, shutdown: &ShutdownSignal)
    -> std::result::Result<(), HandlerError>;
}

#[async_trait]
impl<T: MessageHandler + ?Sized> MessageHandler for Arc<T> {
    async fn handle(
        &self,
        message: &Message,
        shutdown: &ShutdownSignal,
    ) -> std::result::Result<(), HandlerError> {
        (**self).handle(message, shutdown).await
    }
}

/// Retry and polling knobs for a consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Deliveries attempted before a message is dead-lettered.
    pub max_attempts: u32,
    /// Delay before the first redelivery; doubles per attempt.
    pub retry_backoff: Duration,
    /// Upper bound for the redelivery delay.
    pub max_backoff: Duration,
    /// Sleep between polls when every partition is caught up.
    pub poll_interval: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// One member of a consumer group reading every partition of a topic.
///
/// Partitions are polled concurrently, messages within a partition strictly
/// in offset order. A message is committed only after the handler succeeds
/// or after it has been moved to the topic's dead-letter companion.
pub struct Consumer<L: EventLog> {
    log: L,
    group: String,
    topic: Topic,
    handler: Arc<dyn MessageHandler>,
    config: ConsumerConfig,
    metrics: Arc<dyn ConsumerMetrics>,
}

impl<L: EventLog> Consumer<L> {
    /// Creates a consumer with default config and no metrics.
    pub fn new(
        log: L,
        group: impl Into<String>,
        topic: Topic,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            log,
            group: group.into(),
            topic,
            handler,
            config: ConsumerConfig::default(),
            metrics: Arc::new(NoOpConsumerMetrics),
        }
    }

    pub fn with_config(mut self, config: ConsumerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn ConsumerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Consumes until shutdown is triggered.
    ///
    /// Bus errors are logged and retried after the poll interval; they never
    /// end the loop.
    #[tracing::instrument(skip(self, shutdown), fields(group = %self.group, topic = %self.topic))]
    pub async fn run(&self, shutdown: ShutdownSignal) {
        tracing::info!("consumer started");

        while !shutdown.is_triggered() {
            let settled = match self.poll_once(&shutdown).await {
                Ok(settled) => settled,
                Err(err) => {
                    tracing::error!(error = %err, "poll failed");
                    0
                }
            };

            if settled == 0 {
                tokio::select! {
                    () = tokio::time::sleep(self.config.poll_interval) => {}
                    () = shutdown.triggered() => break,
                }
            }
        }

        tracing::info!("consumer stopped");
    }

    /// Delivers at most one message per partition.
    ///
    /// Returns how many messages were settled (acknowledged or dead-lettered).
    pub async fn poll_once(&self, shutdown: &ShutdownSignal) -> Result<usize> {
        let partitions = self.log.partition_count();
        let results = join_all(
            (0..partitions).map(|partition| self.poll_partition(partition, shutdown)),
        )
        .await;

        let mut settled = 0;
        for result in results {
            if result? {
                settled += 1;
            }
        }
        Ok(settled)
    }

    /// Polls until no partition has a settleable message left.
    pub async fn drain(&self, shutdown: &ShutdownSignal) -> Result<usize> {
        let mut total = 0;
        loop {
            let settled = self.poll_once(shutdown).await?;
            if settled == 0 {
                return Ok(total);
            }
            total += settled;
        }
    }

    async fn poll_partition(&self, partition: u32, shutdown: &ShutdownSignal) -> Result<bool> {
        let offset = self
            .log
            .committed_offset(&self.group, self.topic, partition)
            .await?;
        let Some(mut message) = self.log.fetch(self.topic, partition, offset).await? else {
            return Ok(false);
        };

        let max_attempts = self.config.max_attempts.max(1);
        let mut backoff = self.config.retry_backoff;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            message.delivery_attempt = attempt;

            match self.handler.handle(&message, shutdown).await {
                Ok(()) => {
                    self.log
                        .commit(&self.group, self.topic, partition, offset + 1)
                        .await?;
                    self.metrics
                        .record(self.topic, &self.group, ConsumeOutcome::Acked);
                    return Ok(true);
                }
                Err(HandlerError::Cancelled) => {
                    tracing::warn!(partition, offset, "handler cancelled, message left uncommitted");
                    self.metrics
                        .record(self.topic, &self.group, ConsumeOutcome::Cancelled);
                    return Ok(false);
                }
                Err(err) => {
                    tracing::warn!(partition, offset, attempt, max_attempts, error = %err, "handler failed");
                    last_error = err.to_string();

                    if attempt == max_attempts {
                        break;
                    }
                    self.metrics
                        .record(self.topic, &self.group, ConsumeOutcome::Retried);

                    tokio::select! {
                        () = tokio::time::sleep(backoff) => {}
                        () = shutdown.triggered() => return Ok(false),
                    }
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
            }
        }

        self.dead_letter(&message, &last_error).await?;
        Ok(true)
    }

    async fn dead_letter(&self, message: &Message, reason: &str) -> Result<()> {
        let dead_letter_topic = self.topic.dead_letter();
        self.log
            .publish(dead_letter_topic, &message.key, message.payload.clone())
            .await?;
        self.log
            .commit(&self.group, self.topic, message.partition, message.offset + 1)
            .await?;
        self.metrics
            .record(self.topic, &self.group, ConsumeOutcome::DeadLettered);

        tracing::error!(
            partition = message.partition,
            offset = message.offset,
            dead_letter_topic = %dead_letter_topic,
            reason,
            "message dead-lettered after exhausting delivery attempts"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::bus::EventPublisher;
    use crate::memory::InMemoryEventBus;
    use crate::shutdown::shutdown_channel;

    /// Records payloads and fails the first `failures` deliveries.
    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<Vec<u8>>>,
        calls: AtomicU32,
        failures: u32,
    }

    impl RecordingHandler {
        fn failing(failures: u32) -> Self {
            Self {
                failures,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle(
            &self,
            message: &Message,
            _shutdown: &ShutdownSignal,
        ) -> std::result::Result<(), HandlerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(HandlerError::Failed(format!("boom #{call}")));
            }
            self.seen.lock().unwrap().push(message.payload.clone());
            Ok(())
        }
    }

    struct CancelledHandler;

    #[async_trait]
    impl MessageHandler for CancelledHandler {
        async fn handle(
            &self,
            _message: &Message,
            _shutdown: &ShutdownSignal,
        ) -> std::result::Result<(), HandlerError> {
            Err(HandlerError::Cancelled)
        }
    }

    fn fast_config(max_attempts: u32) -> ConsumerConfig {
        ConsumerConfig {
            max_attempts,
            retry_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            poll_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_drain_delivers_in_partition_order() {
        let bus = InMemoryEventBus::new(1);
        for i in 0..3u8 {
            bus.publish(Topic::OrderPaid, "k", vec![i]).await.unwrap();
        }

        let handler = Arc::new(RecordingHandler::default());
        let consumer = Consumer::new(bus.clone(), "g", Topic::OrderPaid, handler.clone());

        let settled = consumer.drain(&ShutdownSignal::never()).await.unwrap();

        assert_eq!(settled, 3);
        assert_eq!(*handler.seen.lock().unwrap(), vec![vec![0u8], vec![1], vec![2]]);
        assert_eq!(bus.lag("g", Topic::OrderPaid).await, 0);
    }

    #[tokio::test]
    async fn test_groups_each_receive_every_message() {
        let bus = InMemoryEventBus::new(2);
        bus.publish(Topic::OrderPaid, "a", vec![1]).await.unwrap();
        bus.publish(Topic::OrderPaid, "b", vec![2]).await.unwrap();

        let first = Arc::new(RecordingHandler::default());
        let second = Arc::new(RecordingHandler::default());
        Consumer::new(bus.clone(), "first", Topic::OrderPaid, first.clone())
            .drain(&ShutdownSignal::never())
            .await
            .unwrap();
        Consumer::new(bus.clone(), "second", Topic::OrderPaid, second.clone())
            .drain(&ShutdownSignal::never())
            .await
            .unwrap();

        assert_eq!(first.seen.lock().unwrap().len(), 2);
        assert_eq!(second.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_message_is_redelivered() {
        let bus = InMemoryEventBus::new(1);
        bus.publish(Topic::OrderPaid, "k", vec![7]).await.unwrap();

        let handler = Arc::new(RecordingHandler::failing(2));
        let consumer = Consumer::new(bus.clone(), "g", Topic::OrderPaid, handler.clone())
            .with_config(fast_config(5));

        consumer.drain(&ShutdownSignal::never()).await.unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert_eq!(*handler.seen.lock().unwrap(), vec![vec![7u8]]);
        assert_eq!(bus.message_count(Topic::OrderPaidDeadLetter).await, 0);
    }

    #[tokio::test]
    async fn test_poison_message_is_dead_lettered() {
        let bus = InMemoryEventBus::new(1);
        bus.publish(Topic::OrderPaid, "k", b"poison".to_vec())
            .await
            .unwrap();
        bus.publish(Topic::OrderPaid, "k", b"fine".to_vec())
            .await
            .unwrap();

        let handler = Arc::new(RecordingHandler::failing(3));
        let consumer = Consumer::new(bus.clone(), "g", Topic::OrderPaid, handler.clone())
            .with_config(fast_config(3));

        let settled = consumer.drain(&ShutdownSignal::never()).await.unwrap();

        assert_eq!(settled, 2);
        let dead = bus.messages(Topic::OrderPaidDeadLetter).await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].payload, b"poison");
        assert_eq!(*handler.seen.lock().unwrap(), vec![b"fine".to_vec()]);
    }

    #[tokio::test]
    async fn test_cancelled_message_stays_uncommitted() {
        let bus = InMemoryEventBus::new(1);
        bus.publish(Topic::OrderPaid, "k", vec![1]).await.unwrap();

        let consumer = Consumer::new(bus.clone(), "g", Topic::OrderPaid, Arc::new(CancelledHandler));
        let settled = consumer.drain(&ShutdownSignal::never()).await.unwrap();

        assert_eq!(settled, 0);
        assert_eq!(bus.lag("g", Topic::OrderPaid).await, 1);
        assert_eq!(bus.message_count(Topic::OrderPaidDeadLetter).await, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let bus = InMemoryEventBus::new(1);
        let handler = Arc::new(RecordingHandler::default());
        let consumer = Consumer::new(bus.clone(), "g", Topic::OrderPaid, handler.clone())
            .with_config(fast_config(3));
        let (trigger, signal) = shutdown_channel();

        let task = tokio::spawn(async move { consumer.run(signal).await });

        bus.publish(Topic::OrderPaid, "k", vec![9]).await.unwrap();
        for _ in 0..100 {
            if bus.lag("g", Topic::OrderPaid).await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        trigger.trigger();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*handler.seen.lock().unwrap(), vec![vec![9u8]]);
    }
}
