//! Error types for the command line runner

use thiserror::Error;
use weft_core::CoreError;

/// CLI error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Flow file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was being read
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Flow file is neither a flow nor a list of flows
    #[error("Failed to parse flow file: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The file does not say which flow to run
    #[error("Flow selection error: {0}")]
    FlowSelection(String),

    /// Error raised by the engine
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
