pub mod http;
pub mod template;

pub use http::{HttpExecutor, HttpRequest, HttpStepInput, RetryConfig, SLUG_HTTP};
pub use template::{TemplateExecutor, SLUG_TEMPLATE};
