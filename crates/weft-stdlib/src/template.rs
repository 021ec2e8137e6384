//! Rendering of step input templates.
//!
//! A template sees two variables: `data`, the upstream output, and
//! `sharedForAll`, the outputs published so far keyed by step id. Missing keys
//! render as empty strings, including lookups through a missing parent.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use serde_json::Value;
use weft_core::{CoreError, SharedSnapshot};

#[derive(Serialize)]
struct TemplateContext<'a> {
    data: &'a Value,
    #[serde(rename = "sharedForAll")]
    shared_for_all: &'a SharedSnapshot,
}

/// Renders input templates with a shared minijinja environment
#[derive(Debug)]
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    /// Create a renderer with chainable undefined lookups
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        Self { env }
    }

    /// Render `template` against the upstream output and the shared state
    pub fn render(
        &self,
        template: &str,
        data: &Value,
        shared_state: &SharedSnapshot,
    ) -> Result<String, CoreError> {
        let context = TemplateContext {
            data,
            shared_for_all: shared_state,
        };
        self.env
            .render_str(template, context)
            .map_err(|e| CoreError::TemplateError(format!("failed to render input template: {}", e)))
    }

    /// Render `template` and parse the result as JSON
    pub fn render_json(
        &self,
        template: &str,
        data: &Value,
        shared_state: &SharedSnapshot,
    ) -> Result<Value, CoreError> {
        let rendered = self.render(template, data, shared_state)?;
        serde_json::from_str(&rendered).map_err(|e| {
            CoreError::TemplateError(format!("rendered template is not valid JSON: {}", e))
        })
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shared() -> SharedSnapshot {
        let mut shared = SharedSnapshot::new();
        shared.insert("login".to_string(), json!({"token": "abc"}));
        shared
    }

    #[test]
    fn test_render_data_and_shared_state() {
        let renderer = TemplateRenderer::new();
        let rendered = renderer
            .render(
                "{{ data.user }}:{{ sharedForAll.login.token }}",
                &json!({"user": "ana"}),
                &shared(),
            )
            .unwrap();
        assert_eq!(rendered, "ana:abc");
    }

    #[test]
    fn test_missing_keys_render_empty() {
        let renderer = TemplateRenderer::new();
        let rendered = renderer
            .render(
                "[{{ data.nope }}][{{ sharedForAll.ghost.token }}]",
                &json!({}),
                &SharedSnapshot::new(),
            )
            .unwrap();
        assert_eq!(rendered, "[][]");
    }

    #[test]
    fn test_render_json_with_tojson_filter() {
        let renderer = TemplateRenderer::new();
        let value = renderer
            .render_json(r#"{"wrapped": {{ data | tojson }}}"#, &json!([1, 2]), &shared())
            .unwrap();
        assert_eq!(value, json!({"wrapped": [1, 2]}));
    }

    #[test]
    fn test_syntax_error_is_template_error() {
        let renderer = TemplateRenderer::new();
        let err = renderer
            .render("{{ data.", &Value::Null, &SharedSnapshot::new())
            .unwrap_err();
        assert!(matches!(err, CoreError::TemplateError(_)));
    }

    #[test]
    fn test_non_json_output_is_template_error() {
        let renderer = TemplateRenderer::new();
        let err = renderer
            .render_json("not json", &Value::Null, &SharedSnapshot::new())
            .unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }
}
