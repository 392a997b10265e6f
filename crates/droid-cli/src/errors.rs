//! Error type for the droid-bootstrap command line

use droid_config::layout::LayoutError;
use droid_config::ConfigError;
use droid_python::BridgeError;
use thiserror::Error;

/// Offset added to bridge status codes when used as a process exit code
pub const BRIDGE_EXIT_BASE: i32 = 10;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Missing setting '{0}': pass it as a flag or run `droid-bootstrap config set {0} <value>`")]
    MissingSetting(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Layout(#[from] LayoutError),

    #[error("Path is not valid UTF-8: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Environment check found {0} problem(s)")]
    Check(usize),

    #[error("No log file found at {0}")]
    NoLogFile(String),

    #[error("{0}")]
    LogLocation(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Bridge(BridgeError::ScriptExit(status)) if (1..=255).contains(status) => {
                *status
            }
            CliError::Bridge(BridgeError::ScriptExit(_)) => 1,
            CliError::Bridge(e) => BRIDGE_EXIT_BASE + e.status_code(),
            _ => 1,
        }
    }
}
