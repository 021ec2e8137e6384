use thiserror::Error;

/// Core error type for the Weft runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The requested start step was never registered
    #[error("Graph error: start step not found: {0}")]
    StartStepNotFound(String),

    /// A step names a successor that is not part of the graph
    #[error("Graph error: step {step} references unknown successor {successor}")]
    UnresolvedSuccessor {
        /// Step holding the dangling edge
        step: String,
        /// The successor id that could not be found
        successor: String,
    },

    /// The successor relation contains a cycle
    #[error("Graph error: cycle detected involving step: {0}")]
    CycleDetected(String),

    /// Two steps share the same id
    #[error("Graph error: duplicate step id: {0}")]
    DuplicateStep(String),

    /// Structural problem with a flow definition
    #[error("Graph error: invalid flow: {0}")]
    InvalidFlow(String),

    /// No executor is registered for the slug
    #[error("Resolution error: no executor registered for slug: {0}")]
    ExecutorNotFound(String),

    /// Step execution error, including recovered panics
    #[error("Step execution error: {0}")]
    StepExecutionError(String),

    /// Input template could not be rendered
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Status recorder failure
    #[error("Recorder error: {0}")]
    RecorderError(String),

    /// Flow could not be found
    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    /// Flow repository failure
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// The run was cancelled by the caller
    #[error("Run cancelled")]
    RunCancelled,

    /// The run exceeded its configured deadline
    #[error("Run timed out after {0}ms")]
    RunTimedOut(u64),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Coarse grouping of [`CoreError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Problems with the step graph itself
    Graph,
    /// A slug could not be mapped to an executor
    Resolution,
    /// Failures surfaced from a step's executor
    Executor,
    /// Status recording failures
    Recorder,
    /// Flow storage failures
    Repository,
    /// Run-level interruption
    Run,
    /// Everything else
    Other,
}

impl CoreError {
    /// Which part of the taxonomy this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::StartStepNotFound(_)
            | CoreError::UnresolvedSuccessor { .. }
            | CoreError::CycleDetected(_)
            | CoreError::DuplicateStep(_)
            | CoreError::InvalidFlow(_) => ErrorCategory::Graph,
            CoreError::ExecutorNotFound(_) => ErrorCategory::Resolution,
            CoreError::StepExecutionError(_)
            | CoreError::TemplateError(_)
            | CoreError::ValidationError(_) => ErrorCategory::Executor,
            CoreError::RecorderError(_) => ErrorCategory::Recorder,
            CoreError::FlowNotFound(_) | CoreError::RepositoryError(_) => {
                ErrorCategory::Repository
            }
            CoreError::RunCancelled | CoreError::RunTimedOut(_) => ErrorCategory::Run,
            CoreError::SerializationError(_)
            | CoreError::ConfigurationError(_)
            | CoreError::Other(_) => ErrorCategory::Other,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

impl From<&str> for CoreError {
    fn from(err: &str) -> Self {
        CoreError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (CoreError::StartStepNotFound("a".to_string()), "Graph error: start step not found: a"),
            (
                CoreError::UnresolvedSuccessor { step: "a".to_string(), successor: "z".to_string() },
                "Graph error: step a references unknown successor z",
            ),
            (CoreError::CycleDetected("b".to_string()), "Graph error: cycle detected involving step: b"),
            (CoreError::ExecutorNotFound("http".to_string()), "Resolution error: no executor registered for slug: http"),
            (CoreError::StepExecutionError("boom".to_string()), "Step execution error: boom"),
            (CoreError::RecorderError("down".to_string()), "Recorder error: down"),
            (CoreError::FlowNotFound("flow1".to_string()), "Flow not found: flow1"),
            (CoreError::RunCancelled, "Run cancelled"),
            (CoreError::RunTimedOut(250), "Run timed out after 250ms"),
            (CoreError::Other("other_err".to_string()), "other_err"),
        ];

        for (error, expected_msg) in errors {
            assert_eq!(error.to_string(), expected_msg);
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(CoreError::CycleDetected("a".into()).category(), ErrorCategory::Graph);
        assert_eq!(CoreError::ExecutorNotFound("x".into()).category(), ErrorCategory::Resolution);
        assert_eq!(CoreError::TemplateError("x".into()).category(), ErrorCategory::Executor);
        assert_eq!(CoreError::RecorderError("x".into()).category(), ErrorCategory::Recorder);
        assert_eq!(CoreError::FlowNotFound("x".into()).category(), ErrorCategory::Repository);
        assert_eq!(CoreError::RunCancelled.category(), ErrorCategory::Run);
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: CoreError = json_error.into();

        match error {
            CoreError::SerializationError(msg) => {
                assert!(msg.contains("expected value"));
            }
            _ => panic!("Expected SerializationError variant"),
        }
    }

    #[test]
    fn test_from_str() {
        let error: CoreError = "test error message".into();
        assert_eq!(error, CoreError::Other("test error message".to_string()));
    }
}
