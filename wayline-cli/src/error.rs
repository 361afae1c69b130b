//! CLI error type.

use std::path::PathBuf;

use thiserror::Error;
use wayline::config::ConfigError;
use wayline::logging::LoggingError;
use wayline::processor::ProcessorError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("{0}")]
    Processor(#[from] ProcessorError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to set signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("{0}")]
    Usage(String),
}
