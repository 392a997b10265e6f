use crate::errors::CliError;
use crate::GlobalOpts;
use clap::Args;
use droid_config::BootstrapConfig;
use droid_logger as logger;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct LogCommand {
    /// Show only the last N lines
    #[arg(short = 'n', long, value_name = "N")]
    pub lines: Option<usize>,
}

/// Log file written by the last run: flag, then config, then the default location
pub fn log_path(opts: &GlobalOpts, config: &BootstrapConfig) -> Result<PathBuf, CliError> {
    if let Some(path) = opts.log_file.clone() {
        return Ok(path);
    }
    if let Some(path) = config.log_file.as_ref() {
        return Ok(PathBuf::from(path));
    }
    logger::default_log_path().map_err(CliError::LogLocation)
}

/// Keep the last `count` lines of `content`
pub fn tail(content: &str, count: Option<usize>) -> Vec<&str> {
    let lines: Vec<&str> = content.lines().collect();
    match count {
        Some(count) if count < lines.len() => lines[lines.len() - count..].to_vec(),
        _ => lines,
    }
}

pub fn handle_log(
    cmd: &LogCommand,
    config: &BootstrapConfig,
    opts: &GlobalOpts,
) -> Result<(), CliError> {
    let path = log_path(opts, config)?;
    if !path.is_file() {
        return Err(CliError::NoLogFile(path.display().to_string()));
    }
    let content = fs::read_to_string(&path)
        .map_err(|e| CliError::LogLocation(format!("Failed to read {}: {}", path.display(), e)))?;

    logger::info(&format!("Displaying log file: {}", path.display()));
    for line in tail(&content, cmd.lines) {
        println!("{}", line);
    }
    Ok(())
}
