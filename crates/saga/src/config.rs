use std::time::Duration;

/// Tunables for the order saga.
#[derive(Debug, Clone)]
pub struct SagaConfig {
    /// Deadline for each stock or payment call.
    pub rpc_timeout: Duration,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(5),
        }
    }
}
