use crate::domain::ids::StepId;
use crate::executor::SharedSnapshot;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// Cross-step map of the most recent successful output of each step.
///
/// Handles are cheap to clone and share one table. Only the orchestrator
/// publishes; workers take snapshots when an invocation starts.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    entries: Arc<DashMap<StepId, Value>>,
}

impl SharedState {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, step_id: &StepId, output: Value) {
        self.entries.insert(step_id.clone(), output);
    }

    /// Latest output of a step
    pub fn get(&self, step_id: &StepId) -> Option<Value> {
        self.entries.get(step_id).map(|entry| entry.value().clone())
    }

    /// Copy of the whole table keyed by step id
    pub fn snapshot(&self) -> SharedSnapshot {
        self.entries
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().clone()))
            .collect()
    }

    /// Number of steps with a published output
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been published yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
