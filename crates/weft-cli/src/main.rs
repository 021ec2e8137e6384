use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use weft_cli::{list_flows, load_flows, run_flow, validate_flows, CliConfig};
use weft_core::{CancellationToken, Pagination};

#[derive(Parser)]
#[command(name = "weft", version, about = "Run workflow graphs of executor steps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a flow and print its outcome
    Run {
        /// YAML or JSON flow file
        file: PathBuf,
        /// Flow to run when the file holds several
        #[arg(long)]
        flow_id: Option<String>,
        /// JSON input of the first step
        #[arg(long, default_value = "null")]
        payload: String,
    },
    /// Check every flow in a file for graph errors
    Validate {
        /// YAML or JSON flow file
        file: PathBuf,
    },
    /// List the flows in a file
    List {
        /// YAML or JSON flow file
        file: PathBuf,
        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: usize,
        /// Flows per page
        #[arg(long, default_value_t = 20)]
        size: usize,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from environment variables
    let (config, ignored) = CliConfig::load().context("Failed to load configuration")?;

    weft_monitoring::init_logging(&config.monitoring())
        .context("Failed to initialize logging")?;
    for message in &ignored {
        warn!("{}", message);
    }

    match cli.command {
        Commands::Run {
            file,
            flow_id,
            payload,
        } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("--payload is not valid JSON")?;
            let flows = load_flows(&file).context("Failed to load flows")?;

            let cancellation = CancellationToken::new();
            let on_signal = cancellation.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling run");
                    on_signal.cancel();
                }
            });

            let report = run_flow(&config, flows, flow_id.as_deref(), payload, cancellation)
                .await
                .context("Run failed")?;
            print_json(&report)?;

            if !report.success {
                bail!(
                    "run {} finished with error: {}",
                    report.run_id,
                    report.error.unwrap_or_default()
                );
            }
            info!(run_id = %report.run_id, "Run succeeded");
        }
        Commands::Validate { file } => {
            let flows = load_flows(&file).context("Failed to load flows")?;
            let reports = validate_flows(&flows);
            print_json(&reports)?;

            let invalid = reports.iter().filter(|r| !r.valid).count();
            if invalid > 0 {
                bail!("{} of {} flows are invalid", invalid, reports.len());
            }
        }
        Commands::List { file, page, size } => {
            let flows = load_flows(&file).context("Failed to load flows")?;
            let page = list_flows(flows, Pagination::new(page, size))
                .await
                .context("Failed to list flows")?;
            print_json(&page)?;
        }
    }

    Ok(())
}
