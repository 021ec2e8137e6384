//! Canned executors for orchestration tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use weft_core::{CoreError, SharedSnapshot, StepContext, StepExecutor, StepId};

/// Returns `{"echo": <previous output>}`
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoExecutor;

#[async_trait]
impl StepExecutor for EchoExecutor {
    async fn execute(
        &self,
        _ctx: &StepContext,
        _input_template: &str,
        previous_output: &Value,
        _shared_state: &SharedSnapshot,
    ) -> Result<Value, CoreError> {
        Ok(json!({ "echo": previous_output }))
    }
}

/// Always fails with the configured message
#[derive(Debug, Clone)]
pub struct FailingExecutor {
    message: String,
}

impl FailingExecutor {
    /// Create an executor failing with `message`
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl StepExecutor for FailingExecutor {
    async fn execute(
        &self,
        _ctx: &StepContext,
        _input_template: &str,
        _previous_output: &Value,
        _shared_state: &SharedSnapshot,
    ) -> Result<Value, CoreError> {
        Err(CoreError::StepExecutionError(self.message.clone()))
    }
}

/// Panics on every call
#[derive(Debug, Default, Clone, Copy)]
pub struct PanickingExecutor;

#[async_trait]
impl StepExecutor for PanickingExecutor {
    async fn execute(
        &self,
        _ctx: &StepContext,
        _input_template: &str,
        _previous_output: &Value,
        _shared_state: &SharedSnapshot,
    ) -> Result<Value, CoreError> {
        panic!("test panic");
    }
}

/// Sleeps, then passes its input through
#[derive(Debug, Clone, Copy)]
pub struct DelayExecutor(pub Duration);

#[async_trait]
impl StepExecutor for DelayExecutor {
    async fn execute(
        &self,
        _ctx: &StepContext,
        _input_template: &str,
        previous_output: &Value,
        _shared_state: &SharedSnapshot,
    ) -> Result<Value, CoreError> {
        tokio::time::sleep(self.0).await;
        Ok(previous_output.clone())
    }
}

/// What a [`RecordingExecutor`] saw on one call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Step that was executed
    pub step_id: StepId,
    /// Template handed to the executor
    pub input_template: String,
    /// Upstream output
    pub input: Value,
    /// Shared state snapshot
    pub shared_state: SharedSnapshot,
}

/// Wraps another executor and keeps every invocation
#[derive(Clone)]
pub struct RecordingExecutor {
    inner: Arc<dyn StepExecutor>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingExecutor {
    /// Record calls made to `inner`
    pub fn new(inner: Arc<dyn StepExecutor>) -> Self {
        Self {
            inner,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every invocation so far, in call order
    pub async fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().await.clone()
    }

    /// Invocations of one step
    pub async fn invocations_of(&self, step: &str) -> Vec<Invocation> {
        self.invocations
            .lock()
            .await
            .iter()
            .filter(|i| i.step_id.as_str() == step)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StepExecutor for RecordingExecutor {
    async fn execute(
        &self,
        ctx: &StepContext,
        input_template: &str,
        previous_output: &Value,
        shared_state: &SharedSnapshot,
    ) -> Result<Value, CoreError> {
        self.invocations.lock().await.push(Invocation {
            step_id: ctx.step_id.clone(),
            input_template: input_template.to_string(),
            input: previous_output.clone(),
            shared_state: shared_state.clone(),
        });
        self.inner
            .execute(ctx, input_template, previous_output, shared_state)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::RunId;

    fn ctx(step: &str) -> StepContext {
        StepContext {
            run_id: RunId::from("run"),
            step_id: StepId::from(step),
            executor_slug: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_recording_executor_keeps_calls() {
        let recorder = RecordingExecutor::new(Arc::new(EchoExecutor));
        let shared = SharedSnapshot::new();

        let output = recorder.execute(&ctx("a"), "tmpl", &json!(1), &shared).await.unwrap();
        recorder.execute(&ctx("b"), "", &output, &shared).await.unwrap();

        assert_eq!(output, json!({"echo": 1}));
        assert_eq!(recorder.invocations().await.len(), 2);
        let a_calls = recorder.invocations_of("a").await;
        assert_eq!(a_calls[0].input_template, "tmpl");
    }

    #[tokio::test]
    async fn test_failing_executor() {
        let err = FailingExecutor::new("nope")
            .execute(&ctx("a"), "", &Value::Null, &SharedSnapshot::new())
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::StepExecutionError("nope".to_string()));
    }
}
