//! Command orchestration for the demo binary.

pub mod demo;

pub use demo::{execute_demo, DemoResult};

use std::path::PathBuf;

use filerotate::{CloseError, ConfigError, ConstructionError, FsError, WriteError};
use thiserror::Error;

use crate::cli::CliError;

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CliError),

    #[error("could not read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("{0}")]
    Open(#[from] ConstructionError),

    #[error("{0}")]
    Write(#[from] WriteError),

    #[error("{0}")]
    Close(#[from] CloseError),
}

/// Result of command execution.
pub type CommandResult<T> = Result<T, CommandError>;
