//!
//! Standard library of step executors for Weft
//!

use std::sync::Arc;
use weft_core::{CoreError, ExecutorRegistry};

pub mod executors;
pub mod schema;
pub mod template;

pub use executors::{HttpExecutor, TemplateExecutor, SLUG_HTTP, SLUG_TEMPLATE};
pub use schema::SchemaValidator;
pub use template::TemplateRenderer;

/// Registry holding every executor this crate provides
pub fn standard_registry() -> Result<ExecutorRegistry, CoreError> {
    let mut registry = ExecutorRegistry::new();
    registry.register(SLUG_HTTP, Arc::new(HttpExecutor::new()?));
    registry.register(SLUG_TEMPLATE, Arc::new(TemplateExecutor::new()));
    Ok(registry)
}
