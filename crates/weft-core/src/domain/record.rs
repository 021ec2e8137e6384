use crate::domain::ids::{RunId, StepId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Lifecycle phase of a step invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    /// The executor is about to be called
    Started,
    /// The executor returned (successfully or not)
    Completed,
}

/// Snapshot of one step invocation, saved on entry and again on exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Run the invocation belongs to
    pub run_id: RunId,

    /// Step that was invoked
    pub step_id: StepId,

    /// Lifecycle phase
    pub phase: ExecutionPhase,

    /// When the invocation started
    pub started_at: DateTime<Utc>,

    /// When the invocation finished, only set for `Completed`
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,

    /// Input handed to the executor
    pub input: Value,

    /// Output returned by the executor
    #[serde(default)]
    pub output: Option<Value>,

    /// Rendered error message
    #[serde(default)]
    pub error: Option<String>,

    /// Resource metrics, only set for `Completed`
    #[serde(default)]
    pub metrics: Option<ExecutionMetrics>,

    /// Shared state visible when the record was taken
    #[serde(default)]
    pub shared_state: Map<String, Value>,
}

impl ExecutionRecord {
    /// Record taken just before the executor is called
    pub fn started(
        run_id: RunId,
        step_id: StepId,
        input: Value,
        shared_state: Map<String, Value>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            step_id,
            phase: ExecutionPhase::Started,
            started_at,
            finished_at: None,
            input,
            output: None,
            error: None,
            metrics: None,
            shared_state,
        }
    }

    /// Supersede a started record with the outcome of the call
    pub fn complete(
        self,
        output: Option<Value>,
        error: Option<String>,
        metrics: ExecutionMetrics,
    ) -> Self {
        Self {
            phase: ExecutionPhase::Completed,
            finished_at: Some(metrics.finished_at),
            output,
            error,
            metrics: Some(metrics),
            ..self
        }
    }

    /// Replace the shared state copy carried by the record
    pub fn with_shared_state(mut self, shared_state: Map<String, Value>) -> Self {
        self.shared_state = shared_state;
        self
    }
}

/// Point-in-time resource reading used for the coarse metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Resident set size of the process in bytes, 0 where unavailable
    pub resident_bytes: u64,
    /// Step executions in flight across the run
    pub active_executions: usize,
}

/// Timing and resource usage of one step invocation.
///
/// Memory is the process resident size and the CPU figure is derived from the
/// number of executions in flight. Both are diagnostics, not accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// Start of the invocation
    pub started_at: DateTime<Utc>,
    /// End of the invocation
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration
    pub execution_time: Duration,
    /// Resource reading before the call
    pub before: ResourceSnapshot,
    /// Resource reading after the call
    pub after: ResourceSnapshot,
}

impl ExecutionMetrics {
    /// Change in resident memory across the call
    pub fn memory_delta(&self) -> i64 {
        self.after.resident_bytes as i64 - self.before.resident_bytes as i64
    }

    /// One millisecond per execution in flight when the call ended
    pub fn cpu_proxy(&self) -> Duration {
        Duration::from_millis(self.after.active_executions as u64)
    }
}
