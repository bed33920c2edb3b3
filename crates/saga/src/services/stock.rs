//! Stock service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::PartId;
use domain::Part;
use tokio::sync::RwLock;

use crate::error::ServiceError;

/// Read access to the parts catalogue.
#[async_trait]
pub trait StockService: Send + Sync {
    /// Looks up a part with its current price and stock level.
    async fn get_part(&self, part_id: &PartId) -> Result<Part, ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryStockState {
    parts: HashMap<PartId, Part>,
    fail_on_lookup: bool,
    latency: Option<Duration>,
}

/// In-memory stock service for testing and single-process runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockService {
    state: Arc<RwLock<InMemoryStockState>>,
}

impl InMemoryStockService {
    /// Creates a new empty stock service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a part or replaces the one with the same id.
    pub async fn upsert_part(&self, part: Part) {
        self.state.write().await.parts.insert(part.id.clone(), part);
    }

    /// Configures the service to fail every lookup.
    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().await.fail_on_lookup = fail;
    }

    /// Delays every lookup, to exercise caller deadlines.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().await.latency = latency;
    }
}

#[async_trait]
impl StockService for InMemoryStockService {
    async fn get_part(&self, part_id: &PartId) -> Result<Part, ServiceError> {
        let (part, fail, latency) = {
            let state = self.state.read().await;
            (
                state.parts.get(part_id).cloned(),
                state.fail_on_lookup,
                state.latency,
            )
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if fail {
            return Err(ServiceError::Unavailable("stock service is down".to_string()));
        }

        part.ok_or_else(|| ServiceError::NotFound(format!("part {part_id}")))
    }
}
