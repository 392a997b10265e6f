use super::{join_search_path, path_text, resolve_home, resolve_search_path};
use crate::errors::CliError;
use crate::GlobalOpts;
use clap::Args;
use droid_config::BootstrapConfig;
use droid_logger as logger;
use droid_python::{run_python, BridgeOptions, EntrySpec, HostInvocation};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct RunCommand {
    /// Interpreter home (PYTHONHOME)
    #[arg(long, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Module search path entry, repeatable; replaces the configured path
    #[arg(long = "path", value_name = "DIR")]
    pub path: Vec<PathBuf>,

    /// Do not append the working directory to sys.path
    #[arg(long)]
    pub no_cwd: bool,

    /// Route the script's stdout and stderr through the log
    #[arg(long)]
    pub capture_output: bool,

    /// Script or module to run (defaults to the configured main-file)
    pub script: Option<String>,

    /// Arguments passed to the script as sys.argv[1:]
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Merge flags over the config into a bridge request
pub fn resolve_invocation(
    cmd: &RunCommand,
    config: &BootstrapConfig,
) -> Result<(HostInvocation, BridgeOptions), CliError> {
    let home = resolve_home(cmd.home.as_deref(), config)?;
    let search_path = resolve_search_path(&cmd.path, config, &home)?;

    let script = cmd
        .script
        .clone()
        .or_else(|| config.main_file.clone())
        .ok_or(CliError::MissingSetting("main-file"))?;

    let argv = std::iter::once(script).chain(cmd.args.iter().cloned());
    let entry = EntrySpec::argv(argv)?;
    let invocation = HostInvocation::new(
        path_text(&home)?,
        join_search_path(&search_path)?,
        entry,
    )?;

    let options = BridgeOptions {
        append_working_dir: !cmd.no_cwd && config.append_working_dir(),
        capture_output: cmd.capture_output,
    };
    Ok((invocation, options))
}

pub fn handle_run(
    cmd: &RunCommand,
    config: &BootstrapConfig,
    opts: &GlobalOpts,
) -> Result<(), CliError> {
    let (invocation, options) = resolve_invocation(cmd, config)?;

    if opts.verbosity_level() > 0 {
        logger::debug(&format!("Interpreter home: {}", invocation.home));
        logger::debug(&format!("Search path: {}", invocation.search_path));
        logger::debug(&format!(
            "Working directory on sys.path: {}",
            options.append_working_dir
        ));
    }

    logger::step(&format!("Running {}", invocation.entry.script_name()));
    run_python(invocation, options)?;
    logger::success("Python script finished");
    Ok(())
}
