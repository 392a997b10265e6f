use crate::errors::CliError;
use crate::GlobalOpts;
use clap::Subcommand;
use colored::Colorize;
use droid_config::BootstrapConfig;
use droid_logger as logger;
use std::path::Path;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print every configured value
    Show,
    /// Print a single value
    Get { key: String },
    /// Store a value
    Set { key: String, value: String },
    /// Remove a value, restoring its default
    Unset { key: String },
    /// Print the config file location
    Path,
}

pub fn handle_config(action: Option<ConfigAction>, opts: &GlobalOpts) -> Result<(), CliError> {
    let path = BootstrapConfig::path();
    logger::debug(&format!("Reading config from: {}", path.display()));
    handle_config_at(action.unwrap_or(ConfigAction::Show), &path, opts)
}

/// Apply `action` to the config file at `path`
pub fn handle_config_at(
    action: ConfigAction,
    path: &Path,
    opts: &GlobalOpts,
) -> Result<(), CliError> {
    match action {
        ConfigAction::Show => {
            let config = BootstrapConfig::load_from(path)?;
            println!("{}", "Configuration:".bold().green());
            if config.is_empty() {
                if opts.verbosity_level() > 0 {
                    println!("  {}", "(empty)".yellow());
                }
            } else {
                for (key, value) in config.values_iter() {
                    println!("  {}: {}", key.cyan(), value);
                }
            }
        }
        ConfigAction::Get { key } => {
            let config = BootstrapConfig::load_from(path)?;
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => {
                    if opts.verbosity_level() > 0 {
                        println!("{}", "(unset)".yellow());
                    }
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = BootstrapConfig::load_from(path)?;
            config.set(&key, &value)?;
            config.save_to(path)?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Unset { key } => {
            let mut config = BootstrapConfig::load_from(path)?;
            config.unset(&key)?;
            config.save_to(path)?;
            logger::success(&format!("Unset {}", key));
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }
    Ok(())
}
