//! Command-line argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::config::default_config_path;

/// Parsed command-line arguments
#[derive(Debug, Parser)]
#[command(
    name = "wincontrol",
    version,
    about = "Enforces CPU affinity, priority, memory page priority and I/O priority rules on running processes.",
    after_help = "EXAMPLES:
    wincontrol                          Run with the per-user configuration
    wincontrol --check                  Validate the configuration and exit
    wincontrol --once --console         Run a single enforcement pass, log to the console
    wincontrol -c D:\\rules.yaml         Use another configuration file"
)]
pub struct Args {
    /// Configuration file [default: <config dir>\WinControl\config.yaml]
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Validate the configuration, print its summary and exit
    #[arg(long, conflicts_with = "once")]
    pub check: bool,

    /// Run a single enforcement pass and exit
    #[arg(long)]
    pub once: bool,

    /// Mirror log output to the console
    #[arg(long)]
    pub console: bool,

    /// Log level override: info, warning or error
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Args {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }
}
