//! Common types and utilities shared across commands

use clap::Parser;
use std::path::PathBuf;

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Decrease verbosity")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for info/debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(long, global = true, help = "Do not print log lines to the console")]
    pub no_stdout: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Write the log to FILE")]
    pub log_file: Option<PathBuf>,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: info and debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
