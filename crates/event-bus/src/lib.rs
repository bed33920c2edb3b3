//! Partitioned, at-least-once event bus.
//!
//! The bus carries encoded domain events between services. Producers append
//! to a topic partition chosen by key; consumer groups read each partition in
//! order and commit offsets once a message is handled. Messages that keep
//! failing are moved to the topic's dead-letter companion.

pub mod bus;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod message;
pub mod metrics;
pub mod shutdown;
pub mod topic;

pub use bus::{EventLog, EventPublisher, partition_for_key};
pub use consumer::{Consumer, ConsumerConfig, MessageHandler};
pub use error::{BusError, HandlerError, Result};
pub use memory::InMemoryEventBus;
pub use message::{Message, RecordPosition};
pub use metrics::{ConsumeOutcome, ConsumerMetrics, MetricsConsumerMetrics, NoOpConsumerMetrics};
pub use shutdown::{ShutdownSignal, ShutdownTrigger, shutdown_channel};
pub use topic::Topic;
