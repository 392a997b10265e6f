use super::{resolve_home, resolve_search_path};
use crate::errors::CliError;
use crate::GlobalOpts;
use clap::Args;
use colored::Colorize;
use droid_config::layout;
use droid_config::BootstrapConfig;
use droid_logger as logger;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone, Default)]
pub struct CheckCommand {
    /// Interpreter home to check
    #[arg(long, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Search path entry to check, repeatable
    #[arg(long = "path", value_name = "DIR")]
    pub path: Vec<PathBuf>,
}

/// Result of inspecting an interpreter layout without booting it
#[derive(Debug, Default)]
pub struct CheckReport {
    pub home: PathBuf,
    pub stdlib: Option<PathBuf>,
    pub search_path: Vec<PathBuf>,
    pub problems: Vec<String>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

pub fn inspect(cmd: &CheckCommand, config: &BootstrapConfig) -> Result<CheckReport, CliError> {
    let home = resolve_home(cmd.home.as_deref(), config)?;
    let mut report = CheckReport {
        home: home.clone(),
        ..Default::default()
    };

    match layout::resolve_stdlib_dir(&home) {
        Ok(stdlib) => report.stdlib = Some(stdlib),
        Err(e) => {
            // Without a stdlib there is nothing to derive a path from.
            report.problems.push(e.to_string());
            return Ok(report);
        }
    }

    report.search_path = resolve_search_path(&cmd.path, config, &home)?;
    if report.search_path.is_empty() {
        report.problems.push("Search path is empty".to_string());
    }
    for missing in layout::missing_entries(&report.search_path) {
        report
            .problems
            .push(format!("Search path entry does not exist: {}", missing.display()));
    }
    if let Err(e) = layout::find_boot_stdlib(&home, &report.search_path) {
        report.problems.push(e.to_string());
    }

    if let Some(main_file) = config.main_file.as_deref() {
        if !main_file_reachable(main_file, &report.search_path, config.append_working_dir()) {
            report.problems.push(format!(
                "Main file '{}' not found in the working directory or search path",
                main_file
            ));
        }
    }
    Ok(report)
}

/// Whether the bridge would find `main_file` when importing it
///
/// A name with a directory is looked up in that directory only, since the
/// bridge puts the script's own directory first on `sys.path`.
fn main_file_reachable(main_file: &str, search_path: &[PathBuf], working_dir: bool) -> bool {
    let script = Path::new(main_file);
    let script = if script.extension().is_some() {
        script.to_path_buf()
    } else {
        script.with_extension("py")
    };
    let has_dir = script
        .parent()
        .is_some_and(|dir| !dir.as_os_str().is_empty());
    if has_dir {
        return script.is_file();
    }

    let working = working_dir.then_some(Path::new("."));
    working
        .into_iter()
        .chain(search_path.iter().map(PathBuf::as_path))
        .any(|dir| dir.join(&script).is_file())
}

pub fn handle_check(
    cmd: &CheckCommand,
    config: &BootstrapConfig,
    opts: &GlobalOpts,
) -> Result<(), CliError> {
    let report = inspect(cmd, config)?;

    println!("{} {}", "Home:".bold(), report.home.display());
    if let Some(stdlib) = &report.stdlib {
        println!("{} {}", "Stdlib:".bold(), stdlib.display());
    }
    if !report.search_path.is_empty() {
        println!("{}", "Search path:".bold());
        for entry in &report.search_path {
            let marker = if entry.exists() {
                "ok".green()
            } else {
                "missing".red()
            };
            println!("  [{}] {}", marker, entry.display());
        }
    }

    if report.is_ok() {
        logger::success("Interpreter layout looks usable");
        return Ok(());
    }
    for problem in &report.problems {
        logger::error(problem);
    }
    if opts.verbosity_level() == 0 {
        logger::show_log_path();
    }
    Err(CliError::Check(report.problems.len()))
}
