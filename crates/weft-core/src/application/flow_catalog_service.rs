use crate::domain::flow::Flow;
use crate::domain::ids::FlowId;
use crate::domain::repository::{FlowReaderRepository, FlowWriterRepository, Page, Pagination};
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Listing projection of a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSummary {
    /// Flow id
    pub id: FlowId,
    /// Flow name
    pub name: String,
    /// Flow description
    pub description: String,
    /// Definition version
    pub version: u32,
}

impl From<&Flow> for FlowSummary {
    fn from(flow: &Flow) -> Self {
        Self {
            id: flow.id.clone(),
            name: flow.name.clone(),
            description: flow.description.clone(),
            version: flow.version,
        }
    }
}

/// Search and authoring operations over stored flows
#[derive(Clone)]
pub struct FlowCatalogService {
    reader: Arc<dyn FlowReaderRepository>,
    writer: Arc<dyn FlowWriterRepository>,
}

impl FlowCatalogService {
    /// Create a catalog over a reader and a writer
    pub fn new(reader: Arc<dyn FlowReaderRepository>, writer: Arc<dyn FlowWriterRepository>) -> Self {
        Self { reader, writer }
    }

    /// Fetch a single flow
    pub async fn get_by_id(&self, id: &FlowId) -> Result<Option<Flow>, CoreError> {
        self.reader.get_by_id(id).await
    }

    /// One page of flow summaries plus totals
    pub async fn get_all(&self, pagination: &Pagination) -> Result<Page<FlowSummary>, CoreError> {
        pagination.validate()?;

        let flows = self.reader.get_all(pagination).await?;
        let total_items = self.reader.count().await?;

        Ok(Page {
            items: flows.iter().map(FlowSummary::from).collect(),
            total_items,
            total_pages: total_items.div_ceil(pagination.size),
        })
    }

    /// Validate and store a new flow
    pub async fn create(&self, flow: &Flow) -> Result<(), CoreError> {
        flow.validate()?;
        self.writer.save(flow).await?;
        info!(flow_id = %flow.id, version = flow.version, "Flow created");
        Ok(())
    }
}
