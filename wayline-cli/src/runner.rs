//! Shared command setup: configuration, logging and the async runtime.

use std::future::Future;

use tokio::runtime::Runtime;
use wayline::config::ConfigFile;
use wayline::logging::{init_logging, LoggingGuard};

use crate::error::CliError;
use crate::GlobalArgs;

/// Everything a session command needs before it can start.
pub struct CliRunner {
    config: ConfigFile,
    runtime: Runtime,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Load configuration, install logging and build the runtime.
    pub fn new(global: &GlobalArgs) -> Result<Self, CliError> {
        let config = load_config(global)?;

        let mut logging = config.logging_config()?;
        if let Some(filter) = &global.log_filter {
            logging = logging.with_filter(filter.as_str());
        }
        if global.no_color {
            logging.ansi = false;
        }
        let guard = init_logging(&logging)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("wayline-worker")
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            config,
            runtime,
            _logging: guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            command,
            "Wayline starting"
        );
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// `--config` when given (the file must exist), otherwise the default path.
pub fn load_config(global: &GlobalArgs) -> Result<ConfigFile, CliError> {
    let config = match &global.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}
