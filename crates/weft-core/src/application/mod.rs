/// Concurrent step scheduler
pub mod orchestrator;

/// Cross-step output table
pub mod shared_state;

/// Resource probes and run summaries
pub mod metrics;

/// Flow assembly facade
pub mod flow_execution_service;

/// Flow search and authoring
pub mod flow_catalog_service;
