//! Configuration for the command line runner
//!
//! Values come from `WEFT_*` environment variables over built-in defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use weft_core::OrchestratorConfig;
use weft_monitoring::MonitoringConfig;

use crate::error::{CliError, CliResult};

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub json_logs: bool,

    /// Where execution records go: `memory://` or `redis://`
    #[serde(default = "default_status_store_url")]
    pub status_store_url: String,

    /// Expiry of stored records in seconds
    #[serde(default = "default_status_ttl_seconds")]
    pub status_ttl_seconds: u64,

    /// Upper bound on a whole run
    #[serde(default)]
    pub run_timeout_ms: Option<u64>,
}

fn default_log_filter() -> String {
    "warn,weft_core=info".to_string()
}

fn default_status_store_url() -> String {
    "memory://local".to_string()
}

fn default_status_ttl_seconds() -> u64 {
    3600 // 1 hour
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            json_logs: false,
            status_store_url: default_status_store_url(),
            status_ttl_seconds: default_status_ttl_seconds(),
            run_timeout_ms: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// Values that could not be parsed keep their default and are returned as
    /// messages, since logging is set up from this configuration.
    pub fn load() -> CliResult<(Self, Vec<String>)> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> CliResult<(Self, Vec<String>)> {
        let mut config = Self::default();
        let mut ignored = Vec::new();

        if let Some(filter) = lookup("WEFT_LOG_FILTER") {
            config.log_filter = filter;
        }

        if let Some(json_logs) = lookup("WEFT_JSON_LOGS") {
            config.json_logs = json_logs.to_lowercase() == "true" || json_logs == "1";
        }

        if let Some(url) = lookup("WEFT_STATUS_STORE_URL") {
            config.status_store_url = url;
        }

        if let Some(ttl) = lookup("WEFT_STATUS_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                config.status_ttl_seconds = ttl;
            } else {
                ignored.push(format!("Invalid WEFT_STATUS_TTL_SECONDS value: {}", ttl));
            }
        }

        if let Some(timeout) = lookup("WEFT_RUN_TIMEOUT_MS") {
            if timeout.to_lowercase() == "none" {
                config.run_timeout_ms = None;
            } else if let Ok(ms) = timeout.parse::<u64>() {
                config.run_timeout_ms = Some(ms);
            } else {
                ignored.push(format!("Invalid WEFT_RUN_TIMEOUT_MS value: {}", timeout));
            }
        }

        config.validate()?;
        Ok((config, ignored))
    }

    /// Check the status store URL scheme
    pub fn validate(&self) -> CliResult<()> {
        if self.status_store_url.starts_with("memory://") {
            return Ok(());
        }
        if self.status_store_url.starts_with("redis://") {
            if cfg!(feature = "redis") {
                return Ok(());
            }
            return Err(CliError::ConfigError(
                "Redis status store requested but 'redis' feature not enabled".to_string(),
            ));
        }
        Err(CliError::ConfigError(format!(
            "Unsupported status store URL: {}",
            self.status_store_url
        )))
    }

    /// Logging settings
    pub fn monitoring(&self) -> MonitoringConfig {
        MonitoringConfig {
            service_name: "weft".to_string(),
            log_filter: self.log_filter.clone(),
            json_logs: self.json_logs,
        }
    }

    /// Orchestrator settings
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            run_timeout: self.run_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let (config, ignored) = CliConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CliConfig::default());
        assert!(ignored.is_empty());
        assert_eq!(config.status_store_url, "memory://local");
        assert_eq!(config.orchestrator().run_timeout, None);
    }

    #[test]
    fn test_environment_overrides() {
        let (config, _) = CliConfig::from_lookup(lookup(&[
            ("WEFT_LOG_FILTER", "debug"),
            ("WEFT_JSON_LOGS", "TRUE"),
            ("WEFT_STATUS_TTL_SECONDS", "60"),
            ("WEFT_RUN_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.log_filter, "debug");
        assert!(config.json_logs);
        assert_eq!(config.status_ttl_seconds, 60);
        assert_eq!(
            config.orchestrator().run_timeout,
            Some(Duration::from_millis(1500))
        );
        assert!(config.monitoring().json_logs);
    }

    #[test]
    fn test_invalid_numbers_keep_defaults() {
        let (config, ignored) = CliConfig::from_lookup(lookup(&[
            ("WEFT_STATUS_TTL_SECONDS", "soon"),
            ("WEFT_RUN_TIMEOUT_MS", "-1"),
        ]))
        .unwrap();
        assert_eq!(config.status_ttl_seconds, 3600);
        assert_eq!(config.run_timeout_ms, None);
        assert_eq!(
            ignored,
            vec![
                "Invalid WEFT_STATUS_TTL_SECONDS value: soon".to_string(),
                "Invalid WEFT_RUN_TIMEOUT_MS value: -1".to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_store_scheme_is_rejected() {
        let result = CliConfig::from_lookup(lookup(&[("WEFT_STATUS_STORE_URL", "postgres://db")]));
        assert!(matches!(result, Err(CliError::ConfigError(_))));
    }

    #[cfg(not(feature = "redis"))]
    #[test]
    fn test_redis_requires_feature() {
        let result =
            CliConfig::from_lookup(lookup(&[("WEFT_STATUS_STORE_URL", "redis://127.0.0.1")]));
        assert!(result.unwrap_err().to_string().contains("'redis' feature"));
    }
}
