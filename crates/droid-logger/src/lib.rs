//! Process-wide logging for the bootstrap bridge
//!
//! Every line goes to three places: the optional log file, the console
//! (unless disabled), and a `tracing` event so an embedding host can attach
//! its own subscriber (logcat on Android, a formatter on the desktop).

use colored::Colorize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Tag used when the host never sets one.
pub const DEFAULT_TAG: &str = "PythonBootstrap";
const LOG_FILE_NAME: &str = "bootstrap.log";

static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);
static VERBOSITY: Mutex<u8> = Mutex::new(0);
static NO_STDOUT: Mutex<bool> = Mutex::new(false);
static TAG: Mutex<Option<String>> = Mutex::new(None);

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Get the current verbosity level
pub fn get_verbosity() -> u8 {
    VERBOSITY.lock().ok().map(|v| *v).unwrap_or(0)
}

/// Set the verbosity level (0 = warnings and errors, 1 = info/debug, 2+ = trace)
pub fn set_verbosity(verbosity: u8) {
    if let Ok(mut v) = VERBOSITY.lock() {
        *v = verbosity;
    }
}

/// Get whether console output is disabled
pub fn get_no_stdout() -> bool {
    NO_STDOUT.lock().ok().map(|v| *v).unwrap_or(false)
}

/// Set whether console output is disabled
pub fn set_no_stdout(disabled: bool) {
    if let Ok(mut v) = NO_STDOUT.lock() {
        *v = disabled;
    }
}

/// Get the tag stamped on every line
pub fn get_tag() -> String {
    TAG.lock()
        .ok()
        .and_then(|guard| guard.clone())
        .unwrap_or_else(|| DEFAULT_TAG.to_string())
}

/// Set the tag stamped on every line
pub fn set_tag(tag: &str) {
    if let Ok(mut v) = TAG.lock() {
        let trimmed = tag.trim();
        *v = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

/// Initialize the logger
///
/// `log_file` overrides the default location under the user config directory.
/// The file is truncated so each run starts with a fresh log.
pub fn init_with_verbosity(
    verbosity: u8,
    no_stdout: bool,
    log_file: Option<PathBuf>,
) -> Result<(), String> {
    set_verbosity(verbosity);
    set_no_stdout(no_stdout);

    let log_file = match log_file {
        Some(path) => path,
        None => default_log_path()?,
    };
    init_log_file(&log_file)
}

/// Log file used when no other location is configured
pub fn default_log_path() -> Result<PathBuf, String> {
    Ok(get_config_dir()?.join(LOG_FILE_NAME))
}

/// Route file output to `path`, truncating any previous content
pub fn init_log_file(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create log directory: {}", e))?;
        }
    }

    if path.exists() {
        let _ = fs::remove_file(path);
    }

    let mut guard = LOG_FILE
        .lock()
        .map_err(|_| "Log file lock poisoned".to_string())?;
    *guard = Some(path.to_path_buf());
    Ok(())
}

fn get_config_dir() -> Result<PathBuf, String> {
    #[cfg(not(target_os = "windows"))]
    let config_dir = dirs::home_dir()
        .ok_or("Could not determine home directory")?
        .join(".config")
        .join("droid-bootstrap");

    #[cfg(target_os = "windows")]
    let config_dir = dirs::config_dir()
        .ok_or("Could not determine config directory")?
        .join("droid-bootstrap");

    Ok(config_dir)
}

fn write_to_log(level: &str, message: &str) {
    if let Ok(guard) = LOG_FILE.lock() {
        if let Some(ref log_path) = *guard {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                let _ = writeln!(file, "[{}] [{}] {} {}", timestamp, get_tag(), level, message);
            }
        }
    }
}

fn emit_event(level: Level, message: &str) {
    let tag = get_tag();
    match level {
        Level::Debug => tracing::debug!(tag = %tag, "{}", message),
        Level::Info => tracing::info!(tag = %tag, "{}", message),
        Level::Warn => tracing::warn!(tag = %tag, "{}", message),
        Level::Error => tracing::error!(tag = %tag, "{}", message),
    }
}

fn console_enabled() -> bool {
    !get_no_stdout()
}

/// Log a line at the given level
pub fn log(level: Level, message: &str) {
    write_to_log(level.label(), message);
    emit_event(level, message);
    if !console_enabled() {
        return;
    }
    match level {
        Level::Debug if get_verbosity() >= 1 => {
            eprintln!("{} {}", "DEBUG:".blue().bold(), message);
        }
        Level::Info if get_verbosity() >= 1 => eprintln!("{}", message),
        Level::Warn => eprintln!("{} {}", "warning:".yellow().bold(), message),
        Level::Error => eprintln!("{} {}", "Error:".red().bold(), message),
        _ => {}
    }
}

/// Log an informational message (to console if verbose >= 1, always to file)
pub fn info(message: &str) {
    log(Level::Info, message);
}

/// Log a debug message (to console if verbose >= 1, always to file)
pub fn debug(message: &str) {
    log(Level::Debug, message);
}

/// Log a warning message
pub fn warn(message: &str) {
    log(Level::Warn, message);
}

/// Log an error message
pub fn error(message: &str) {
    log(Level::Error, message);
}

/// Log a success message
pub fn success(message: &str) {
    write_to_log("SUCCESS", message);
    emit_event(Level::Info, message);
    if console_enabled() {
        let check = "\u{2714}".green().bold();
        eprintln!("{} {}", check, message);
    }
}

/// Log a step message (trace console output, always to file)
pub fn step(message: &str) {
    write_to_log("STEP:", message);
    emit_event(Level::Debug, message);
    if console_enabled() && get_verbosity() >= 2 {
        eprintln!("TRACE: {}", message);
    }
}

/// Split an interpreter traceback into the lines that get logged
pub fn traceback_lines(traceback: &str) -> Vec<String> {
    traceback
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!(">> {}", line.trim_end()))
        .collect()
}

/// Log every line of an interpreter traceback at error level
pub fn traceback(traceback: &str) {
    for line in traceback_lines(traceback) {
        error(&line);
    }
}

/// Get the log file path
pub fn get_log_path() -> Option<PathBuf> {
    LOG_FILE.lock().ok().and_then(|guard| guard.clone())
}

/// Print the log file path to the user
pub fn show_log_path() {
    if let Some(path) = get_log_path() {
        eprintln!("Log file: {}", path.display());
    } else {
        eprintln!("Log file location not available");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    static SERIAL: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_traceback_lines_skip_blank_lines() {
        let tb = "Traceback (most recent call last):\n\n  File \"main.py\", line 1\nValueError: boom\n";
        let lines = traceback_lines(tb);
        assert_eq!(
            lines,
            vec![
                ">> Traceback (most recent call last):",
                ">>   File \"main.py\", line 1",
                ">> ValueError: boom",
            ]
        );
    }

    #[test]
    fn test_set_tag_falls_back_to_default() {
        let _guard = serial();
        set_tag("MyApp");
        assert_eq!(get_tag(), "MyApp");
        set_tag("   ");
        assert_eq!(get_tag(), DEFAULT_TAG);
    }

    #[test]
    fn test_lines_are_written_to_log_file() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("bootstrap.log");
        set_no_stdout(true);
        init_log_file(&path).unwrap();

        info("Setting PYTHONHOME: /data/python");
        error("Failed to import main module.");

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[PythonBootstrap] INFO Setting PYTHONHOME: /data/python"));
        assert!(lines[1].ends_with("ERROR Failed to import main module."));
        set_no_stdout(false);
    }

    #[test]
    fn test_init_truncates_previous_log() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bootstrap.log");
        fs::write(&path, "stale\n").unwrap();

        init_log_file(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(get_log_path(), Some(path));
    }
}
