use crate::domain::ids::{RunId, StepId};
use crate::domain::record::{ExecutionMetrics, ResourceSnapshot};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

const PAGE_SIZE: u64 = 4096;

/// Takes the coarse resource readings attached to each invocation
#[derive(Debug, Clone, Default)]
pub struct ResourceProbe {
    active: Arc<AtomicUsize>,
}

/// Marks one execution as in flight until dropped
#[derive(Debug)]
pub struct ActiveExecution {
    active: Arc<AtomicUsize>,
}

impl Drop for ActiveExecution {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ResourceProbe {
    /// Create a probe with no executions in flight
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an execution as in flight
    pub fn enter(&self) -> ActiveExecution {
        self.active.fetch_add(1, Ordering::SeqCst);
        ActiveExecution {
            active: Arc::clone(&self.active),
        }
    }

    /// Executions currently in flight
    pub fn active_executions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Read resident memory and the in-flight count
    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            resident_bytes: resident_bytes(),
            active_executions: self.active_executions(),
        }
    }
}

// Second field of statm is resident pages. Other platforms report 0.
fn resident_bytes() -> u64 {
    std::fs::read_to_string("/proc/self/statm")
        .ok()
        .and_then(|statm| statm.split_whitespace().nth(1)?.parse::<u64>().ok())
        .map(|pages| pages.saturating_mul(PAGE_SIZE))
        .unwrap_or(0)
}

/// Log the metrics table of a finished run
pub fn log_run_summary(run_id: &RunId, metrics: &HashMap<StepId, ExecutionMetrics>) {
    let mut steps: Vec<_> = metrics.iter().collect();
    steps.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (step_id, m) in &steps {
        debug!(
            run_id = %run_id,
            step_id = %step_id,
            execution_time_ms = m.execution_time.as_millis() as u64,
            memory_delta_bytes = m.memory_delta(),
            cpu_proxy_ms = m.cpu_proxy().as_millis() as u64,
            "Step metrics"
        );
    }

    let total_ms: u128 = steps.iter().map(|(_, m)| m.execution_time.as_millis()).sum();
    info!(
        run_id = %run_id,
        steps = steps.len(),
        total_step_time_ms = total_ms as u64,
        "Run metrics (memory and cpu figures are coarse proxies)"
    );
}
