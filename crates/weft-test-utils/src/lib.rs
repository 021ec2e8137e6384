//! Testing utilities for Weft.
//!
//! Mocks for every core contract, canned executors and builders for common
//! graph shapes.

pub mod executors;
pub mod flows;
pub mod mocks;

/// Re-export commonly used types for convenience
pub use mockall;

pub use executors::{
    DelayExecutor, EchoExecutor, FailingExecutor, Invocation, PanickingExecutor, RecordingExecutor,
};
pub use flows::{diamond_flow, linear_flow};
pub use mocks::{
    create_mock_flow_reader, create_mock_resolver, create_mock_status_repository,
    MockExecutorResolver, MockFlowReaderRepository, MockFlowWriterRepository,
    MockStatusRepository, MockStepExecutor,
};
