use clap::{Parser, Subcommand};
use droid_bootstrap::{
    commands::{
        check::{self, CheckCommand},
        config::{self, ConfigAction},
        log::{self, LogCommand},
        run::{self, RunCommand},
    },
    errors::CliError,
    GlobalOpts,
};
use droid_config::BootstrapConfig;
use droid_logger as logger;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "droid-bootstrap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Embedded Python bootstrap",
    long_about = "droid-bootstrap boots an embedded CPython interpreter, runs an entry script, and tears the interpreter down again."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot the interpreter and run a script
    Run(RunCommand),
    /// Validate an interpreter home and search path without booting
    Check(CheckCommand),
    /// Show or edit the bootstrap configuration
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
    /// Print the log file from the last run
    Log(LogCommand),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .try_init();
}

fn dispatch(cli: Cli, config: &BootstrapConfig) -> Result<(), CliError> {
    match cli.command {
        Commands::Run(cmd) => run::handle_run(&cmd, config, &cli.global),
        Commands::Check(cmd) => check::handle_check(&cmd, config, &cli.global),
        Commands::Config { action } => config::handle_config(action, &cli.global),
        Commands::Log(cmd) => log::handle_log(&cmd, config, &cli.global),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = match BootstrapConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}", e);
            BootstrapConfig::default()
        }
    };

    if let Some(tag) = config.log_tag.as_deref() {
        logger::set_tag(tag);
    }
    if matches!(cli.command, Commands::Log(_)) {
        // Reading the log must not truncate it.
        logger::set_verbosity(cli.global.verbosity_level());
        logger::set_no_stdout(cli.global.no_stdout);
    } else {
        let log_file = cli
            .global
            .log_file
            .clone()
            .or_else(|| config.log_file.as_ref().map(PathBuf::from));
        if let Err(e) = logger::init_with_verbosity(
            cli.global.verbosity_level(),
            cli.global.no_stdout,
            log_file,
        ) {
            eprintln!("Warning: Failed to initialize logger: {}", e);
        }
    }

    if let Err(e) = dispatch(cli, &config) {
        logger::error(&e.to_string());
        process::exit(e.exit_code());
    }
}
