//! Simplified monitoring module for Weft.
//!
//! Only structured logging is provided; run metrics are emitted as log events
//! by the orchestrator.

use serde::{Deserialize, Serialize};
use tracing::info;

pub mod logging;

pub use logging::{env_filter, init_logging};

/// Configuration for initializing logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Log level filter (e.g., "info,weft_core=debug"), overridden by `RUST_LOG`
    pub log_filter: String,
    /// JSON lines instead of the pretty format
    pub json_logs: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "weft".to_string(),
            log_filter: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Shutdown the monitoring system
pub fn shutdown() {
    info!("Shutting down monitoring system");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "weft");
        assert_eq!(config.log_filter, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_config_partial_deserialize() {
        let config: MonitoringConfig =
            serde_json::from_str(r#"{"json_logs": true}"#).unwrap();
        assert!(config.json_logs);
        assert_eq!(config.service_name, "weft");
    }
}
