//! In-memory state store implementation for Weft
//!
//! This crate provides in-memory implementations of the repository
//! interfaces defined in weft-core. It is useful for development, testing
//! and single-process runs where persistence is not required.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

pub mod repositories;
pub use repositories::{InMemoryFlowRepository, InMemoryStatusRepository};

use weft_core::{
    ExecutionRecord, Flow, FlowId, FlowReaderRepository, FlowWriterRepository, StatusRepository,
    StepId,
};

/// Provider for in-memory state store repositories
pub struct InMemoryStateStoreProvider {
    flows: Arc<RwLock<BTreeMap<FlowId, Flow>>>,
    records: Arc<RwLock<HashMap<StepId, ExecutionRecord>>>,
}

impl InMemoryStateStoreProvider {
    /// Create a new in-memory state store provider
    pub fn new() -> Self {
        Self {
            flows: Arc::new(RwLock::new(BTreeMap::new())),
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create repository instances over the shared storage
    pub fn create_repositories(
        &self,
    ) -> (
        Arc<dyn FlowReaderRepository>,
        Arc<dyn FlowWriterRepository>,
        Arc<dyn StatusRepository>,
    ) {
        debug!("Creating in-memory repositories");

        let flows = Arc::new(InMemoryFlowRepository::new(self.flows.clone()));
        let status = Arc::new(InMemoryStatusRepository::new(self.records.clone()));

        (flows.clone(), flows, status)
    }
}

impl Default for InMemoryStateStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}
