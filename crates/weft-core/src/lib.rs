//!
//! Weft Core - orchestration core for declarative workflow graphs
//!
//! This crate defines the step graph model, the contracts for pluggable
//! executors and status storage, and the orchestrator that runs a graph
//! concurrently with one worker per step.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - graph model, records and repository interfaces
pub mod domain;

/// Application services - orchestrator and facades
pub mod application;

/// Executor and resolver contracts
pub mod executor;

/// Error types
pub mod error;

pub use error::{CoreError, ErrorCategory};

pub use domain::flow::{Flow, Step, StepGraph};
pub use domain::ids::{FlowId, RunId, StepId};
pub use domain::reachability::{count_runs, RunCounts};
pub use domain::record::{ExecutionMetrics, ExecutionPhase, ExecutionRecord, ResourceSnapshot};
pub use domain::repository::{
    FlowReaderRepository, FlowWriterRepository, Page, Pagination, StatusRepository,
};

pub use application::flow_catalog_service::{FlowCatalogService, FlowSummary};
pub use application::flow_execution_service::FlowExecutionService;
pub use application::orchestrator::{Orchestrator, OrchestratorConfig, RunOutcome};
pub use application::shared_state::SharedState;

pub use executor::{ExecutorRegistry, ExecutorResolver, SharedSnapshot, StepContext, StepExecutor};

// Callers pass cancellation tokens into the execute methods
pub use tokio_util::sync::CancellationToken;
