//! Concurrent fan-out/fan-in engine.
//!
//! Every registered step gets its own worker task and inbox. Workers run the
//! step's executor and report a completion back to the orchestrator, which owns
//! the run's bookkeeping: it publishes outputs to the shared state, keeps the
//! metrics table and the final result, and routes outputs to successor inboxes.
//! The run ends when no delivered message is left without a completion.

use crate::application::metrics::{log_run_summary, ResourceProbe};
use crate::application::shared_state::SharedState;
use crate::domain::flow::Step;
use crate::domain::ids::{RunId, StepId};
use crate::domain::reachability::RunCounts;
use crate::domain::record::{ExecutionMetrics, ExecutionRecord};
use crate::domain::repository::StatusRepository;
use crate::executor::{ExecutorResolver, StepContext, StepExecutor};
use crate::CoreError;
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Settings applied to every run of an orchestrator
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Stop collecting and fail the run once this much time has passed
    pub run_timeout: Option<Duration>,
}

/// Result of one run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Identifier of the run
    pub run_id: RunId,

    /// Output of the last successful completion, `Null` if there was none.
    ///
    /// Failed completions never overwrite it, so a run that ends on a failure
    /// still reports what the last successful step produced next to
    /// [`RunOutcome::error`].
    pub output: Value,

    /// Last error observed, if any
    pub error: Option<CoreError>,

    /// Completions received
    pub executions: usize,

    /// Executions the graph produces when every step succeeds
    pub expected_executions: usize,

    /// Metrics of the last invocation of each step
    pub metrics: HashMap<StepId, ExecutionMetrics>,
}

impl RunOutcome {
    /// Whether the run finished without error
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Collapse into the output or the error
    pub fn into_result(self) -> Result<Value, CoreError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.output),
        }
    }
}

struct StepMessage {
    input: Value,
}

struct StepCompletion {
    step_id: StepId,
    input: Value,
    result: Result<Value, CoreError>,
    metrics: ExecutionMetrics,
}

enum RunEvent {
    Completed(StepCompletion),
    Stopped(CoreError),
}

/// Runs a registered step graph
pub struct Orchestrator {
    steps: HashMap<StepId, Step>,
    order: Vec<StepId>,
    resolver: Arc<dyn ExecutorResolver>,
    status_repository: Arc<dyn StatusRepository>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator with no steps
    pub fn new(
        resolver: Arc<dyn ExecutorResolver>,
        status_repository: Arc<dyn StatusRepository>,
    ) -> Self {
        Self {
            steps: HashMap::new(),
            order: Vec::new(),
            resolver,
            status_repository,
            config: OrchestratorConfig::default(),
        }
    }

    /// Replace the run settings
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a step to the graph
    pub fn register(&mut self, step: Step) -> Result<(), CoreError> {
        if step.id.as_str().is_empty() {
            return Err(CoreError::InvalidFlow("step id cannot be empty".to_string()));
        }
        if self.steps.contains_key(&step.id) {
            return Err(CoreError::DuplicateStep(step.id.to_string()));
        }

        if !step.share_output_with_all {
            warn!(
                step_id = %step.id,
                "share_output_with_all=false has no effect, successful outputs are always shared"
            );
        }

        debug!(step_id = %step.id, executor_slug = %step.executor_slug, "Registering step");
        self.order.push(step.id.clone());
        self.steps.insert(step.id.clone(), step);
        Ok(())
    }

    /// Number of registered steps
    pub fn registered_steps(&self) -> usize {
        self.order.len()
    }

    /// Executions a run from `start` produces when every step succeeds
    pub fn count_runs(&self, start: &StepId) -> Result<usize, CoreError> {
        RunCounts::compute(&self.steps, start).map(|counts| counts.total())
    }

    /// Run the graph from `start` with `payload` as the first input
    pub async fn execute(&self, start: &StepId, payload: Value) -> Result<RunOutcome, CoreError> {
        self.execute_with_cancellation(start, payload, CancellationToken::new())
            .await
    }

    /// Run the graph, stopping early if `cancellation` fires.
    ///
    /// Graph errors (unknown start, dangling successor, cycle) are returned as
    /// `Err` before any worker is spawned. Everything that happens during the run
    /// is reported through [`RunOutcome::error`].
    pub async fn execute_with_cancellation(
        &self,
        start: &StepId,
        payload: Value,
        cancellation: CancellationToken,
    ) -> Result<RunOutcome, CoreError> {
        if !self.steps.contains_key(start) {
            return Err(CoreError::StartStepNotFound(start.to_string()));
        }
        let run_counts = RunCounts::compute(&self.steps, start)?;

        let run_id = RunId::new();
        let token = cancellation.child_token();
        let shared = SharedState::new();
        let probe = ResourceProbe::new();
        let (completion_tx, mut completion_rx) = mpsc::unbounded_channel();

        info!(
            run_id = %run_id,
            start_step = %start,
            registered_steps = self.order.len(),
            expected_executions = run_counts.total(),
            "Starting run"
        );

        // One worker per registered step, reachable or not
        let mut inboxes = HashMap::with_capacity(self.order.len());
        let mut handles = Vec::with_capacity(self.order.len());
        for step in self.order.iter().filter_map(|id| self.steps.get(id)) {
            let executor = self.resolver.get_by_slug(&step.executor_slug).await;
            if let Err(error) = &executor {
                warn!(
                    run_id = %run_id,
                    step_id = %step.id,
                    executor_slug = %step.executor_slug,
                    error = %error,
                    "Executor could not be resolved, step will fail when triggered"
                );
            }

            let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
            inboxes.insert(step.id.clone(), inbox_tx);

            let worker = StepWorker {
                run_id: run_id.clone(),
                step: step.clone(),
                executor,
                shared: shared.clone(),
                status_repository: Arc::clone(&self.status_repository),
                completions: completion_tx.clone(),
                probe: probe.clone(),
                token: token.clone(),
            };
            handles.push(tokio::spawn(worker.run(inbox_rx)));
        }
        drop(completion_tx);

        let mut final_output = Value::Null;
        let mut final_error = None;
        let mut executions = 0usize;
        let mut metrics = HashMap::new();

        let mut pending = 0usize;
        match inboxes.get(start) {
            Some(inbox) if inbox.send(StepMessage { input: payload }).is_ok() => pending = 1,
            _ => {
                final_error = Some(CoreError::Other(format!(
                    "worker for start step {} is unavailable",
                    start
                )));
            }
        }

        let deadline = self.config.run_timeout;
        let timeout = async move {
            match deadline {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(timeout);

        while pending > 0 {
            // Stop signals win over completions that are ready at the same time
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => RunEvent::Stopped(CoreError::RunCancelled),
                _ = &mut timeout => RunEvent::Stopped(CoreError::RunTimedOut(
                    deadline.map(|d| d.as_millis() as u64).unwrap_or_default(),
                )),
                received = completion_rx.recv() => match received {
                    Some(completion) => RunEvent::Completed(completion),
                    None => RunEvent::Stopped(CoreError::Other(
                        "step workers stopped before the run finished".to_string(),
                    )),
                },
            };

            let completion = match event {
                RunEvent::Completed(completion) => completion,
                RunEvent::Stopped(error) => {
                    warn!(run_id = %run_id, pending, error = %error, "Run stopped early");
                    final_error = Some(error);
                    break;
                }
            };

            pending -= 1;
            executions += 1;

            let StepCompletion {
                step_id,
                input,
                result,
                metrics: step_metrics,
            } = completion;
            metrics.insert(step_id.clone(), step_metrics);

            let Some(step) = self.steps.get(&step_id) else {
                continue;
            };

            let forward = match result {
                Ok(output) => {
                    trace!(run_id = %run_id, step_id = %step_id, "Step completed");
                    shared.publish(&step_id, output.clone());
                    final_output = output.clone();
                    Some(output)
                }
                Err(error) if step.continue_on_error => {
                    warn!(
                        run_id = %run_id,
                        step_id = %step_id,
                        error = %error,
                        "Step failed, continuing with its input"
                    );
                    Some(input)
                }
                Err(error) => {
                    warn!(
                        run_id = %run_id,
                        step_id = %step_id,
                        error = %error,
                        skipped_executions = run_counts.skipped_below(&self.steps, &step_id),
                        "Step failed, successors skipped"
                    );
                    final_error = Some(error);
                    None
                }
            };

            if let Some(value) = forward {
                for next in step.successors() {
                    match inboxes.get(next) {
                        Some(inbox) if inbox.send(StepMessage { input: value.clone() }).is_ok() => {
                            pending += 1;
                        }
                        _ => warn!(
                            run_id = %run_id,
                            step_id = %step_id,
                            successor = %next,
                            "Successor unavailable, message dropped"
                        ),
                    }
                }
            }
        }

        // Broadcast the stop signal and wait for every worker to exit
        token.cancel();
        drop(inboxes);
        for joined in join_all(handles).await {
            if let Err(error) = joined {
                warn!(run_id = %run_id, error = %error, "Step worker terminated abnormally");
            }
        }

        log_run_summary(&run_id, &metrics);
        info!(
            run_id = %run_id,
            executions,
            success = final_error.is_none(),
            "Closing run"
        );

        Ok(RunOutcome {
            run_id,
            output: final_output,
            error: final_error,
            executions,
            expected_executions: run_counts.total(),
            metrics,
        })
    }
}

struct StepWorker {
    run_id: RunId,
    step: Step,
    executor: Result<Arc<dyn StepExecutor>, CoreError>,
    shared: SharedState,
    status_repository: Arc<dyn StatusRepository>,
    completions: mpsc::UnboundedSender<StepCompletion>,
    probe: ResourceProbe,
    token: CancellationToken,
}

impl StepWorker {
    async fn run(self, mut inbox: mpsc::UnboundedReceiver<StepMessage>) {
        loop {
            let message = tokio::select! {
                _ = self.token.cancelled() => None,
                message = inbox.recv() => message,
            };
            let Some(message) = message else {
                break;
            };

            // Cancellation drops an executor call that is still running
            let completion = tokio::select! {
                _ = self.token.cancelled() => None,
                completion = self.invoke(message.input) => Some(completion),
            };
            let Some(completion) = completion else {
                break;
            };

            if self.completions.send(completion).is_err() {
                break;
            }
        }
        trace!(run_id = %self.run_id, step_id = %self.step.id, "Step worker stopped");
    }

    async fn invoke(&self, input: Value) -> StepCompletion {
        let _active = self.probe.enter();
        let started_at = Utc::now();
        let clock = Instant::now();
        let before = self.probe.snapshot();
        let snapshot = self.shared.snapshot();

        let started = ExecutionRecord::started(
            self.run_id.clone(),
            self.step.id.clone(),
            input.clone(),
            snapshot.clone(),
            started_at,
        );
        self.record(started.clone()).await;

        debug!(run_id = %self.run_id, step_id = %self.step.id, "Executing step");
        let result = match &self.executor {
            Ok(executor) => {
                let ctx = StepContext {
                    run_id: self.run_id.clone(),
                    step_id: self.step.id.clone(),
                    executor_slug: self.step.executor_slug.clone(),
                };
                AssertUnwindSafe(executor.execute(
                    &ctx,
                    &self.step.input_template,
                    &input,
                    &snapshot,
                ))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(CoreError::StepExecutionError(format!(
                        "panic recovered: {}",
                        panic_detail(panic.as_ref())
                    )))
                })
            }
            Err(error) => Err(error.clone()),
        };

        let metrics = ExecutionMetrics {
            started_at,
            finished_at: Utc::now(),
            execution_time: clock.elapsed(),
            before,
            after: self.probe.snapshot(),
        };

        // Siblings may have published while this step was running
        let completed = started
            .complete(
                result.as_ref().ok().cloned(),
                result.as_ref().err().map(ToString::to_string),
                metrics.clone(),
            )
            .with_shared_state(self.shared.snapshot());
        self.record(completed).await;

        StepCompletion {
            step_id: self.step.id.clone(),
            input,
            result,
            metrics,
        }
    }

    async fn record(&self, record: ExecutionRecord) {
        if let Err(error) = self.status_repository.save(record).await {
            warn!(
                run_id = %self.run_id,
                step_id = %self.step.id,
                error = %error,
                "Failed to save execution record"
            );
        }
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
