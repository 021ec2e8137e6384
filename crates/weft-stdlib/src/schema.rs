//! JSON schema validation of rendered executor inputs.

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use tracing::debug;
use weft_core::CoreError;

/// Request schema of the `http` executor
pub const HTTP_REQUEST_SCHEMA: &str = include_str!("../schemas/http_request.json");

/// A compiled draft 7 schema
pub struct SchemaValidator {
    compiled: JSONSchema,
}

impl SchemaValidator {
    /// Compile the schema document in `source`
    pub fn compile(source: &str) -> Result<Self, CoreError> {
        let schema: Value = serde_json::from_str(source)
            .map_err(|e| CoreError::ConfigurationError(format!("schema is not valid JSON: {}", e)))?;
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| CoreError::ConfigurationError(format!("Invalid JSON Schema: {}", e)))?;
        Ok(Self { compiled })
    }

    /// Check `instance`, listing every violation in the error
    pub fn validate(&self, instance: &Value) -> Result<(), CoreError> {
        if let Err(errors) = self.compiled.validate(instance) {
            let details: Vec<String> = errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path, error)
                    }
                })
                .collect();
            debug!(violations = details.len(), "Input failed schema validation");
            return Err(CoreError::ValidationError(format!(
                "validation failed: {}",
                details.join("; ")
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}
