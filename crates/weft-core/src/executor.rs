//! Contracts between the orchestrator and pluggable step executors.

use crate::domain::ids::{RunId, StepId};
use crate::CoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Copy of the shared state handed to an executor: step id to latest output
pub type SharedSnapshot = Map<String, Value>;

/// Identifies the invocation an executor is serving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepContext {
    /// Run the invocation belongs to
    pub run_id: RunId,
    /// Step being executed
    pub step_id: StepId,
    /// Slug the executor was resolved from
    pub executor_slug: String,
}

/// Performs the actual work of a step.
///
/// Different steps may call the same executor concurrently; a single step is
/// never invoked concurrently with itself.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Run the step against its template, the upstream output and the shared state
    async fn execute(
        &self,
        ctx: &StepContext,
        input_template: &str,
        previous_output: &Value,
        shared_state: &SharedSnapshot,
    ) -> Result<Value, CoreError>;
}

/// Maps executor slugs to executors
#[async_trait]
pub trait ExecutorResolver: Send + Sync {
    /// Find the executor registered for `slug`
    async fn get_by_slug(&self, slug: &str) -> Result<Arc<dyn StepExecutor>, CoreError>;
}

/// Process-local slug map
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn StepExecutor>>,
}

impl ExecutorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor, replacing any previous one for the slug
    pub fn register(&mut self, slug: impl Into<String>, executor: Arc<dyn StepExecutor>) {
        let slug = slug.into();
        debug!(slug = %slug, "Registering executor");
        self.executors.insert(slug, executor);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_executor(mut self, slug: impl Into<String>, executor: Arc<dyn StepExecutor>) -> Self {
        self.register(slug, executor);
        self
    }

    /// Registered slugs, sorted
    pub fn slugs(&self) -> Vec<&str> {
        let mut slugs: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        slugs.sort_unstable();
        slugs
    }

    /// Whether a slug is registered
    pub fn contains(&self, slug: &str) -> bool {
        self.executors.contains_key(slug)
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("slugs", &self.slugs())
            .finish()
    }
}

#[async_trait]
impl ExecutorResolver for ExecutorRegistry {
    async fn get_by_slug(&self, slug: &str) -> Result<Arc<dyn StepExecutor>, CoreError> {
        self.executors
            .get(slug)
            .cloned()
            .ok_or_else(|| CoreError::ExecutorNotFound(slug.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Constant(Value);

    #[async_trait]
    impl StepExecutor for Constant {
        async fn execute(
            &self,
            _ctx: &StepContext,
            _input_template: &str,
            _previous_output: &Value,
            _shared_state: &SharedSnapshot,
        ) -> Result<Value, CoreError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_registry_resolves_registered_slug() {
        let registry = ExecutorRegistry::new().with_executor("const", Arc::new(Constant(json!(7))));

        let executor = registry.get_by_slug("const").await.unwrap();
        let ctx = StepContext {
            run_id: RunId::from("run"),
            step_id: StepId::from("a"),
            executor_slug: "const".to_string(),
        };
        let output = executor
            .execute(&ctx, "", &Value::Null, &SharedSnapshot::new())
            .await
            .unwrap();

        assert_eq!(output, json!(7));
        assert!(registry.contains("const"));
        assert_eq!(registry.slugs(), vec!["const"]);
    }

    #[tokio::test]
    async fn test_registry_unknown_slug() {
        let registry = ExecutorRegistry::new();
        let err = registry.get_by_slug("missing").await.err();
        assert_eq!(err, Some(CoreError::ExecutorNotFound("missing".to_string())));
    }
}
