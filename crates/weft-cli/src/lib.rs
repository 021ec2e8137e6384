//! Command line runner for Weft flows.
//!
//! Flow files are YAML or JSON and hold either a single flow or a list of
//! flows. Every command produces a serializable report that the binary prints
//! as JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use weft_core::{
    count_runs, CancellationToken, Flow, FlowCatalogService, FlowExecutionService, FlowId,
    FlowSummary, Page, Pagination, StatusRepository,
};
use weft_state_inmemory::{InMemoryFlowRepository, InMemoryStatusRepository};

pub mod config;
pub mod error;

pub use config::CliConfig;
pub use error::{CliError, CliResult};

#[derive(Deserialize)]
#[serde(untagged)]
enum FlowFile {
    Many(Vec<Flow>),
    One(Box<Flow>),
}

/// Parse the content of a flow file
pub fn parse_flows(content: &str) -> CliResult<Vec<Flow>> {
    let file: FlowFile =
        serde_yaml::from_str(content).map_err(|e| CliError::ParseError(e.to_string()))?;
    let flows = match file {
        FlowFile::Many(flows) => flows,
        FlowFile::One(flow) => vec![*flow],
    };
    debug!(flows = flows.len(), "Parsed flow file");
    Ok(flows)
}

/// Read and parse a flow file
pub fn load_flows(path: &Path) -> CliResult<Vec<Flow>> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_flows(&content)
}

/// Status store selected by the configured URL
pub fn build_status_repository(config: &CliConfig) -> CliResult<Arc<dyn StatusRepository>> {
    config.validate()?;

    #[cfg(feature = "redis")]
    if config.status_store_url.starts_with("redis://") {
        let settings = weft_state_redis::RedisStatusConfig {
            ttl_seconds: config.status_ttl_seconds,
            ..weft_state_redis::RedisStatusConfig::default()
        };
        let repository =
            weft_state_redis::RedisStatusRepository::with_config(&config.status_store_url, settings)
                .map_err(|e| CliError::ConfigError(format!("Invalid Redis URL: {}", e)))?;
        info!("Using Redis status store");
        return Ok(Arc::new(repository));
    }

    info!("Using in-memory status store");
    Ok(Arc::new(InMemoryStatusRepository::default()))
}

/// Result of `weft run`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub flow_id: FlowId,
    pub success: bool,
    pub output: Value,
    pub error: Option<String>,
    pub executions: usize,
    pub expected_executions: usize,
}

/// Run one flow from `flows`.
///
/// `flow_id` may be omitted when the file holds exactly one flow.
pub async fn run_flow(
    config: &CliConfig,
    flows: Vec<Flow>,
    flow_id: Option<&str>,
    payload: Value,
    cancellation: CancellationToken,
) -> CliResult<RunReport> {
    let flow_id = select_flow(&flows, flow_id)?;
    let registry = weft_stdlib::standard_registry()?;
    let status = build_status_repository(config)?;
    let reader = Arc::new(InMemoryFlowRepository::with_flows(flows));

    let service = FlowExecutionService::new(reader, Arc::new(registry), status)
        .with_config(config.orchestrator());
    let outcome = service
        .execute_with_cancellation(&flow_id, payload, cancellation)
        .await?;

    Ok(RunReport {
        run_id: outcome.run_id.to_string(),
        flow_id,
        success: outcome.is_success(),
        error: outcome.error.as_ref().map(ToString::to_string),
        output: outcome.output,
        executions: outcome.executions,
        expected_executions: outcome.expected_executions,
    })
}

fn select_flow(flows: &[Flow], flow_id: Option<&str>) -> CliResult<FlowId> {
    match (flow_id, flows) {
        (Some(id), _) => Ok(FlowId::from(id)),
        (None, [only]) => Ok(only.id.clone()),
        (None, []) => Err(CliError::FlowSelection("file holds no flows".to_string())),
        (None, many) => Err(CliError::FlowSelection(format!(
            "file holds {} flows, pass --flow-id",
            many.len()
        ))),
    }
}

/// Per-flow result of `weft validate`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub flow_id: FlowId,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Step executions a fully successful run would produce
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_executions: Option<usize>,
}

/// Check every flow's graph
pub fn validate_flows(flows: &[Flow]) -> Vec<ValidationReport> {
    flows
        .iter()
        .map(|flow| {
            match flow
                .validate()
                .and_then(|_| count_runs(flow, &flow.first_step_id))
            {
                Ok(expected) => ValidationReport {
                    flow_id: flow.id.clone(),
                    valid: true,
                    error: None,
                    expected_executions: Some(expected),
                },
                Err(error) => ValidationReport {
                    flow_id: flow.id.clone(),
                    valid: false,
                    error: Some(error.to_string()),
                    expected_executions: None,
                },
            }
        })
        .collect()
}

/// One page of flow summaries, ordered by id
pub async fn list_flows(flows: Vec<Flow>, pagination: Pagination) -> CliResult<Page<FlowSummary>> {
    let repository = Arc::new(InMemoryFlowRepository::with_flows(flows));
    let catalog = FlowCatalogService::new(repository.clone(), repository);
    catalog.get_all(&pagination).await.map_err(CliError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TWO_FLOWS: &str = r#"
- id: greet
  name: Greet
  first_step_id: hello
  steps:
    - id: hello
      executor_slug: template
      input_template: '{"greeting": "hello {{ data.name }}"}'
- id: broken
  name: Broken
  first_step_id: a
  steps:
    - id: a
      executor_slug: template
      next_step_ids: [a]
"#;

    #[test]
    fn test_parse_single_json_flow() {
        let flows = parse_flows(
            r#"{"id": "f", "name": "F", "first_step_id": "a", "steps": [{"id": "a", "executor_slug": "template"}]}"#,
        )
        .unwrap();
        assert_eq!(flows.len(), 1);
        assert!(flows[0].steps[0].share_output_with_all);
    }

    #[test]
    fn test_parse_yaml_list() {
        let flows = parse_flows(TWO_FLOWS).unwrap();
        let ids: Vec<&str> = flows.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["greet", "broken"]);
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        assert!(matches!(parse_flows("just words"), Err(CliError::ParseError(_))));
    }

    #[test]
    fn test_validate_reports_cycle() {
        let reports = validate_flows(&parse_flows(TWO_FLOWS).unwrap());
        assert!(reports[0].valid);
        assert_eq!(reports[0].expected_executions, Some(1));
        assert!(!reports[1].valid);
        assert!(reports[1].error.as_deref().unwrap_or_default().contains("cycle"));
    }

    #[test]
    fn test_select_flow() {
        let flows = parse_flows(TWO_FLOWS).unwrap();
        assert!(matches!(select_flow(&flows, None), Err(CliError::FlowSelection(_))));
        assert_eq!(select_flow(&flows, Some("greet")).unwrap(), FlowId::from("greet"));
        assert_eq!(select_flow(&flows[..1], None).unwrap(), FlowId::from("greet"));
    }

    #[tokio::test]
    async fn test_run_template_flow() {
        let flows = parse_flows(TWO_FLOWS).unwrap();
        let report = run_flow(
            &CliConfig::default(),
            flows,
            Some("greet"),
            json!({"name": "weft"}),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(report.success);
        assert_eq!(report.output, json!({"greeting": "hello weft"}));
        assert_eq!(report.executions, 1);
    }

    #[tokio::test]
    async fn test_run_unknown_flow() {
        let flows = parse_flows(TWO_FLOWS).unwrap();
        let result = run_flow(
            &CliConfig::default(),
            flows,
            Some("ghost"),
            Value::Null,
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(
            result,
            Err(CliError::Core(weft_core::CoreError::FlowNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_list_pages() {
        let flows = parse_flows(TWO_FLOWS).unwrap();
        let page = list_flows(flows, Pagination::new(0, 1)).await.unwrap();
        assert_eq!(page.total_items, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items[0].id, FlowId::from("broken"));
    }
}
