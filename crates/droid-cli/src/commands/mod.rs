pub mod check;
pub mod config;
pub mod log;
pub mod run;

use crate::errors::CliError;
use droid_config::layout;
use droid_config::BootstrapConfig;
use droid_logger as logger;
use std::env;
use std::path::{Path, PathBuf};

/// Interpreter home from the flag, falling back to the config
pub fn resolve_home(flag: Option<&Path>, config: &BootstrapConfig) -> Result<PathBuf, CliError> {
    flag.map(Path::to_path_buf)
        .or_else(|| config.python_home.as_ref().map(PathBuf::from))
        .ok_or(CliError::MissingSetting("python-home"))
}

/// Search path entries: flags, then config, then derived from the home layout
pub fn resolve_search_path(
    flags: &[PathBuf],
    config: &BootstrapConfig,
    home: &Path,
) -> Result<Vec<PathBuf>, CliError> {
    if !flags.is_empty() {
        return Ok(flags.to_vec());
    }
    if !config.python_path.is_empty() {
        return Ok(config.python_path.iter().map(PathBuf::from).collect());
    }
    let derived = layout::default_search_path(home)?;
    logger::debug(&format!(
        "Derived search path from {}: {} entries",
        home.display(),
        derived.len()
    ));
    Ok(derived)
}

pub fn path_text(path: &Path) -> Result<String, CliError> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| CliError::InvalidPath(path.display().to_string()))
}

/// Serialize entries with the platform separator
pub fn join_search_path(entries: &[PathBuf]) -> Result<String, CliError> {
    let joined =
        env::join_paths(entries).map_err(|e| CliError::InvalidPath(format!("{}", e)))?;
    joined
        .into_string()
        .map_err(|raw| CliError::InvalidPath(raw.to_string_lossy().to_string()))
}
