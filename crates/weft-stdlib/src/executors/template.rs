use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;
use weft_core::{CoreError, SharedSnapshot, StepContext, StepExecutor};

use crate::template::TemplateRenderer;

/// Slug the executor is registered under
pub const SLUG_TEMPLATE: &str = "template";

/// Renders the input template and returns the resulting JSON document.
///
/// Useful for reshaping data between steps without an external call.
#[derive(Debug, Default)]
pub struct TemplateExecutor {
    renderer: TemplateRenderer,
}

impl TemplateExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StepExecutor for TemplateExecutor {
    async fn execute(
        &self,
        ctx: &StepContext,
        input_template: &str,
        previous_output: &Value,
        shared_state: &SharedSnapshot,
    ) -> Result<Value, CoreError> {
        trace!(step_id = %ctx.step_id, "Rendering template step");
        self.renderer
            .render_json(input_template, previous_output, shared_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weft_core::{RunId, StepId};

    #[tokio::test]
    async fn test_template_executor_reshapes_input() {
        let ctx = StepContext {
            run_id: RunId::new(),
            step_id: StepId::from("shape"),
            executor_slug: SLUG_TEMPLATE.to_string(),
        };
        let mut shared = SharedSnapshot::new();
        shared.insert("first".to_string(), json!({"id": 9}));

        let output = TemplateExecutor::new()
            .execute(
                &ctx,
                r#"{"name": "{{ data.name }}", "firstId": {{ sharedForAll.first.id }}}"#,
                &json!({"name": "weft"}),
                &shared,
            )
            .await
            .unwrap();

        assert_eq!(output, json!({"name": "weft", "firstId": 9}));
    }
}
