//! Structured logging module using tracing.
//!
//! Events go to stderr so that stdout stays free for command output.

use anyhow::Context;
use std::io;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::MonitoringConfig;

/// Filter from `RUST_LOG`, falling back to the configured directives
pub fn env_filter(config: &MonitoringConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
}

/// Initialize structured logging
pub fn init_logging(config: &MonitoringConfig) -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::registry().with(env_filter(config));

    if config.json_logs {
        // JSON logs for aggregation
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(io::stderr);

        tracing::subscriber::set_global_default(subscriber.with(json_layer))
            .context("Failed to set global default subscriber")?;
    } else {
        // Pretty logs for development
        let fmt_layer = fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(io::stderr);

        tracing::subscriber::set_global_default(subscriber.with(fmt_layer))
            .context("Failed to set global default subscriber")?;
    }

    info!(
        service_name = %config.service_name,
        log_format = if config.json_logs { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}
