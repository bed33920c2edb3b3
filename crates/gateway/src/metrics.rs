//! Metrics port for authorization checks.

use crate::check::AuthVerdict;

pub trait AuthMetrics: Send + Sync {
    fn record(&self, verdict: AuthVerdict);
}

/// Exports `auth_checks_total{verdict}` through the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsAuthMetrics;

impl AuthMetrics for MetricsAuthMetrics {
    fn record(&self, verdict: AuthVerdict) {
        metrics::counter!("auth_checks_total", "verdict" => verdict.as_str()).increment(1);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpAuthMetrics;

impl AuthMetrics for NoOpAuthMetrics {
    fn record(&self, _verdict: AuthVerdict) {}
}
