use crate::application::orchestrator::{Orchestrator, OrchestratorConfig, RunOutcome};
use crate::domain::ids::FlowId;
use crate::domain::repository::{FlowReaderRepository, StatusRepository};
use crate::executor::ExecutorResolver;
use crate::CoreError;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Loads a stored flow and runs it on a fresh orchestrator
#[derive(Clone)]
pub struct FlowExecutionService {
    /// Repository for flow definitions
    flow_reader: Arc<dyn FlowReaderRepository>,

    /// Slug to executor mapping
    resolver: Arc<dyn ExecutorResolver>,

    /// Sink for execution records
    status_repository: Arc<dyn StatusRepository>,

    /// Settings handed to every orchestrator
    config: OrchestratorConfig,
}

impl FlowExecutionService {
    /// Create a new flow execution service
    pub fn new(
        flow_reader: Arc<dyn FlowReaderRepository>,
        resolver: Arc<dyn ExecutorResolver>,
        status_repository: Arc<dyn StatusRepository>,
    ) -> Self {
        Self {
            flow_reader,
            resolver,
            status_repository,
            config: OrchestratorConfig::default(),
        }
    }

    /// Replace the orchestrator settings
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the flow `flow_id` with `payload` as input to its first step
    pub async fn execute(&self, flow_id: &FlowId, payload: Value) -> Result<RunOutcome, CoreError> {
        self.execute_with_cancellation(flow_id, payload, CancellationToken::new())
            .await
    }

    /// Same as [`execute`](Self::execute), stopping early if `cancellation` fires
    pub async fn execute_with_cancellation(
        &self,
        flow_id: &FlowId,
        payload: Value,
        cancellation: CancellationToken,
    ) -> Result<RunOutcome, CoreError> {
        // Find flow definition
        let flow = self
            .flow_reader
            .get_by_id(flow_id)
            .await?
            .ok_or_else(|| CoreError::FlowNotFound(flow_id.to_string()))?;

        debug!(flow_id = %flow.id, version = flow.version, steps = flow.steps.len(), "Assembling flow");

        let mut orchestrator = Orchestrator::new(
            Arc::clone(&self.resolver),
            Arc::clone(&self.status_repository),
        )
        .with_config(self.config.clone());
        for step in flow.steps {
            orchestrator.register(step)?;
        }

        let outcome = orchestrator
            .execute_with_cancellation(&flow.first_step_id, payload, cancellation)
            .await?;

        info!(
            flow_id = %flow.id,
            run_id = %outcome.run_id,
            executions = outcome.executions,
            success = outcome.is_success(),
            "Flow run finished"
        );
        Ok(outcome)
    }
}
