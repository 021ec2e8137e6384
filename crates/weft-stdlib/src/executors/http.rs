use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};
use weft_core::{CoreError, SharedSnapshot, StepContext, StepExecutor};

use crate::schema::{SchemaValidator, HTTP_REQUEST_SCHEMA};
use crate::template::TemplateRenderer;

/// Slug the executor is registered under
pub const SLUG_HTTP: &str = "http";

/// Rendered input of an `http` step
#[derive(Debug, Clone, Deserialize)]
pub struct HttpStepInput {
    /// Request to send
    pub request: HttpRequest,
    /// Retry policy, a single attempt when absent
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

/// Request description
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    /// GET, POST, PUT, DELETE, PATCH, HEAD or OPTIONS
    pub method: String,
    /// Target URL
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub query_params: HashMap<String, String>,
    /// JSON body, ignored for GET and HEAD
    #[serde(default)]
    pub body: Option<Value>,
    /// Per-request timeout in milliseconds, 0 or absent for none
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Most attempts a retry policy may ask for
pub const MAX_ATTEMPTS: u32 = 10;

/// Longest pause between attempts in milliseconds
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Retry policy for transport errors and 5xx responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds
    #[serde(default)]
    pub delay: u64,
}

impl RetryConfig {
    /// Policy with attempts and delay kept within the allowed range
    pub fn bounded(self) -> Self {
        Self {
            max_attempts: self.max_attempts.clamp(1, MAX_ATTEMPTS),
            delay: self.delay.min(MAX_RETRY_DELAY_MS),
        }
    }
}

/// Executor that renders its input into an HTTP request and returns the
/// decoded JSON response
#[derive(Debug)]
pub struct HttpExecutor {
    client: Client,
    renderer: TemplateRenderer,
    validator: SchemaValidator,
}

impl HttpExecutor {
    /// Create an executor with a default client
    pub fn new() -> Result<Self, CoreError> {
        Self::with_client(Client::new())
    }

    /// Create an executor sending through `client`
    pub fn with_client(client: Client) -> Result<Self, CoreError> {
        Ok(Self {
            client,
            renderer: TemplateRenderer::new(),
            validator: SchemaValidator::compile(HTTP_REQUEST_SCHEMA)?,
        })
    }

    fn build_request(&self, request: &HttpRequest, method: &Method) -> RequestBuilder {
        let mut req = self.client.request(method.clone(), &request.url);

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if !request.query_params.is_empty() {
            let mut query: Vec<(&String, &String)> = request.query_params.iter().collect();
            query.sort();
            req = req.query(&query);
        }

        if *method != Method::GET && *method != Method::HEAD {
            if let Some(body) = &request.body {
                req = req.json(body);
            }
        }

        if let Some(millis) = request.timeout.filter(|ms| *ms > 0) {
            req = req.timeout(Duration::from_millis(millis));
        }

        req
    }

    async fn send(&self, input: &HttpStepInput) -> Result<Value, CoreError> {
        let request = &input.request;
        let method = Method::from_str(&request.method).map_err(|_| {
            CoreError::ValidationError(format!("Invalid HTTP method: {}", request.method))
        })?;
        let retry = input
            .retry
            .unwrap_or(RetryConfig {
                max_attempts: 1,
                delay: 0,
            })
            .bounded();
        let max_attempts = retry.max_attempts;

        let mut attempt = 1;
        loop {
            debug!(method = %method, url = %request.url, attempt, "Sending HTTP request");
            let result = self.build_request(request, &method).send().await;

            let retryable = match &result {
                Ok(response) => response.status().is_server_error(),
                Err(_) => true,
            };
            if retryable && attempt < max_attempts {
                match &result {
                    Ok(response) => warn!(
                        url = %request.url,
                        attempt,
                        status = response.status().as_u16(),
                        "HTTP request failed, retrying"
                    ),
                    Err(error) => warn!(
                        url = %request.url,
                        attempt,
                        error = %error,
                        "HTTP request failed, retrying"
                    ),
                }
                tokio::time::sleep(Duration::from_millis(retry.delay)).await;
                attempt += 1;
                continue;
            }

            let response = result.map_err(|e| {
                CoreError::StepExecutionError(format!("HTTP request failed: {}", e))
            })?;
            let status = response.status();
            let text = response.text().await.map_err(|e| {
                CoreError::StepExecutionError(format!("Failed to read response text: {}", e))
            })?;
            return decode_response(status, &text);
        }
    }
}

fn decode_response(status: StatusCode, text: &str) -> Result<Value, CoreError> {
    if !status.is_success() {
        return Err(CoreError::StepExecutionError(format!(
            "HTTP request returned status {}: {}",
            status.as_u16(),
            text
        )));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| {
        CoreError::StepExecutionError(format!("HTTP response is not valid JSON: {}", e))
    })
}

#[async_trait]
impl StepExecutor for HttpExecutor {
    async fn execute(
        &self,
        ctx: &StepContext,
        input_template: &str,
        previous_output: &Value,
        shared_state: &SharedSnapshot,
    ) -> Result<Value, CoreError> {
        let rendered = self
            .renderer
            .render_json(input_template, previous_output, shared_state)?;
        self.validator.validate(&rendered)?;
        let input: HttpStepInput = serde_json::from_value(rendered)?;

        debug!(run_id = %ctx.run_id, step_id = %ctx.step_id, url = %input.request.url, "Executing http step");
        self.send(&input).await
    }
}
