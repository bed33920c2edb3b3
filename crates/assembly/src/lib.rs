//! Ship assembly worker.
//!
//! Consumes `order.paid`, waits out a randomized build time and publishes
//! `order.assembled`. The wait is cancellable; an interrupted build publishes
//! nothing and leaves the message for redelivery.

pub mod config;
pub mod metrics;
pub mod worker;

pub use config::AssemblyConfig;
pub use metrics::{AssemblyMetrics, BuildStatus, MetricsAssemblyMetrics, NoOpAssemblyMetrics};
pub use worker::{ASSEMBLY_GROUP, AssemblyHandler, assembly_consumer};
