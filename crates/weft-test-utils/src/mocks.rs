//! Mock implementations of the core contracts.

use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;
use std::sync::Arc;
use weft_core::{
    CoreError, ExecutionRecord, ExecutorResolver, Flow, FlowId, FlowReaderRepository,
    FlowWriterRepository, Pagination, SharedSnapshot, StatusRepository, StepContext, StepExecutor,
    StepId,
};

// Generate the mock implementation for StepExecutor
mock! {
    pub StepExecutor {}

    #[async_trait]
    impl StepExecutor for StepExecutor {
        async fn execute(
            &self,
            ctx: &StepContext,
            input_template: &str,
            previous_output: &Value,
            shared_state: &SharedSnapshot,
        ) -> Result<Value, CoreError>;
    }
}

// Generate the mock implementation for ExecutorResolver
mock! {
    pub ExecutorResolver {}

    #[async_trait]
    impl ExecutorResolver for ExecutorResolver {
        async fn get_by_slug(&self, slug: &str) -> Result<Arc<dyn StepExecutor>, CoreError>;
    }
}

// Generate the mock implementation for StatusRepository
mock! {
    pub StatusRepository {}

    #[async_trait]
    impl StatusRepository for StatusRepository {
        async fn save(&self, record: ExecutionRecord) -> Result<(), CoreError>;
        async fn get_by_step_id(&self, step_id: &StepId) -> Result<Option<ExecutionRecord>, CoreError>;
        async fn get_all(&self) -> Result<Vec<ExecutionRecord>, CoreError>;
    }
}

// Generate the mock implementation for FlowReaderRepository
mock! {
    pub FlowReaderRepository {}

    #[async_trait]
    impl FlowReaderRepository for FlowReaderRepository {
        async fn get_by_id(&self, id: &FlowId) -> Result<Option<Flow>, CoreError>;
        async fn get_all(&self, pagination: &Pagination) -> Result<Vec<Flow>, CoreError>;
        async fn count(&self) -> Result<usize, CoreError>;
    }
}

// Generate the mock implementation for FlowWriterRepository
mock! {
    pub FlowWriterRepository {}

    #[async_trait]
    impl FlowWriterRepository for FlowWriterRepository {
        async fn save(&self, flow: &Flow) -> Result<(), CoreError>;
    }
}

/// Status repository that accepts every save
pub fn create_mock_status_repository() -> MockStatusRepository {
    let mut mock = MockStatusRepository::new();

    mock.expect_save().returning(|_| Ok(()));
    mock.expect_get_by_step_id().returning(|_| Ok(None));
    mock.expect_get_all().returning(|| Ok(Vec::new()));

    mock
}

/// Resolver that hands out the same executor for any slug
pub fn create_mock_resolver(executor: Arc<dyn StepExecutor>) -> MockExecutorResolver {
    let mut mock = MockExecutorResolver::new();

    mock.expect_get_by_slug()
        .returning(move |_| Ok(Arc::clone(&executor)));

    mock
}

/// Flow reader that knows a single flow
pub fn create_mock_flow_reader(flow: Flow) -> MockFlowReaderRepository {
    let mut mock = MockFlowReaderRepository::new();

    let known = flow.clone();
    mock.expect_get_by_id()
        .returning(move |id| Ok(Some(known.clone()).filter(|f| &f.id == id)));
    mock.expect_get_all()
        .returning(move |_| Ok(vec![flow.clone()]));
    mock.expect_count().returning(|| Ok(1));

    mock
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weft_core::{RunId, Step};

    fn ctx() -> StepContext {
        StepContext {
            run_id: RunId::from("run"),
            step_id: StepId::from("a"),
            executor_slug: "mock".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_status_repository_default_behavior() {
        let repo = create_mock_status_repository();
        assert!(repo.get_all().await.unwrap().is_empty());
        assert!(repo.get_by_step_id(&StepId::from("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_resolver_returns_executor() {
        let mut executor = MockStepExecutor::new();
        executor
            .expect_execute()
            .returning(|_, _, previous, _| Ok(json!({ "seen": previous })));

        let resolver = create_mock_resolver(Arc::new(executor));
        let resolved = resolver.get_by_slug("anything").await.unwrap();
        let output = resolved
            .execute(&ctx(), "", &json!(1), &SharedSnapshot::new())
            .await
            .unwrap();

        assert_eq!(output, json!({"seen": 1}));
    }

    #[tokio::test]
    async fn test_mock_flow_reader_filters_by_id() {
        let flow = Flow::new("f1", "One", "a").with_step(Step::new("a", "mock"));
        let reader = create_mock_flow_reader(flow);

        assert!(reader.get_by_id(&FlowId::from("f1")).await.unwrap().is_some());
        assert!(reader.get_by_id(&FlowId::from("f2")).await.unwrap().is_none());
        assert_eq!(reader.count().await.unwrap(), 1);
    }
}
