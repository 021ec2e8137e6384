use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use weft_core::{
    CoreError, ExecutionRecord, Flow, FlowId, FlowReaderRepository, FlowWriterRepository,
    Pagination, StatusRepository, StepId,
};

/// In-memory implementation of the StatusRepository.
///
/// Keeps the latest record per step; a completed record replaces the started
/// one written before it.
pub struct InMemoryStatusRepository {
    records: Arc<RwLock<HashMap<StepId, ExecutionRecord>>>,
}

impl InMemoryStatusRepository {
    /// Create a new in-memory status repository
    pub fn new(records: Arc<RwLock<HashMap<StepId, ExecutionRecord>>>) -> Self {
        Self { records }
    }
}

impl Default for InMemoryStatusRepository {
    fn default() -> Self {
        Self::new(Arc::new(RwLock::new(HashMap::new())))
    }
}

#[async_trait]
impl StatusRepository for InMemoryStatusRepository {
    async fn save(&self, record: ExecutionRecord) -> Result<(), CoreError> {
        debug!(step_id = %record.step_id, phase = ?record.phase, "Saving execution record");
        let mut records = self.records.write().await;
        records.insert(record.step_id.clone(), record);
        Ok(())
    }

    async fn get_by_step_id(&self, step_id: &StepId) -> Result<Option<ExecutionRecord>, CoreError> {
        let records = self.records.read().await;
        Ok(records.get(step_id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<ExecutionRecord>, CoreError> {
        let records = self.records.read().await;
        let mut all: Vec<ExecutionRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| a.step_id.cmp(&b.step_id));
        Ok(all)
    }
}

/// In-memory implementation of the flow reader and writer repositories.
///
/// Flows are kept ordered by id so pages are stable.
pub struct InMemoryFlowRepository {
    flows: Arc<RwLock<BTreeMap<FlowId, Flow>>>,
}

impl InMemoryFlowRepository {
    /// Create a new in-memory flow repository
    pub fn new(flows: Arc<RwLock<BTreeMap<FlowId, Flow>>>) -> Self {
        Self { flows }
    }

    /// Repository preloaded with `flows`; later duplicates replace earlier ones
    pub fn with_flows(flows: impl IntoIterator<Item = Flow>) -> Self {
        let map = flows
            .into_iter()
            .map(|flow| (flow.id.clone(), flow))
            .collect::<BTreeMap<_, _>>();
        Self::new(Arc::new(RwLock::new(map)))
    }
}

impl Default for InMemoryFlowRepository {
    fn default() -> Self {
        Self::new(Arc::new(RwLock::new(BTreeMap::new())))
    }
}

#[async_trait]
impl FlowReaderRepository for InMemoryFlowRepository {
    async fn get_by_id(&self, id: &FlowId) -> Result<Option<Flow>, CoreError> {
        let flows = self.flows.read().await;
        Ok(flows.get(id).cloned())
    }

    async fn get_all(&self, pagination: &Pagination) -> Result<Vec<Flow>, CoreError> {
        pagination.validate()?;
        let flows = self.flows.read().await;
        Ok(flows
            .values()
            .skip(pagination.offset())
            .take(pagination.size)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize, CoreError> {
        Ok(self.flows.read().await.len())
    }
}

#[async_trait]
impl FlowWriterRepository for InMemoryFlowRepository {
    async fn save(&self, flow: &Flow) -> Result<(), CoreError> {
        debug!(flow_id = %flow.id, "Saving flow");
        let mut flows = self.flows.write().await;
        flows.insert(flow.id.clone(), flow.clone());
        Ok(())
    }
}
