//! Metrics port for the assembly worker.

use std::time::Duration;

/// How a build attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Success,
    Error,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Success => "success",
            BuildStatus::Error => "error",
        }
    }
}

/// Records build durations without tying the worker to a metrics backend.
pub trait AssemblyMetrics: Send + Sync {
    fn record_build(&self, duration: Duration, status: BuildStatus);
}

/// Exports build durations through the `metrics` facade.
///
/// - `assembly_duration_seconds{status}` (histogram)
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsAssemblyMetrics;

impl AssemblyMetrics for MetricsAssemblyMetrics {
    fn record_build(&self, duration: Duration, status: BuildStatus) {
        metrics::histogram!("assembly_duration_seconds", "status" => status.as_str())
            .record(duration.as_secs_f64());
    }
}

/// Discards all measurements.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpAssemblyMetrics;

impl AssemblyMetrics for NoOpAssemblyMetrics {
    fn record_build(&self, _duration: Duration, _status: BuildStatus) {}
}
