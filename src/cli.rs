use clap::Parser;
use std::path::PathBuf;

use crate::config::{DEFAULT_CONFIG_FILE, DEFAULT_ENV_FILE};
use crate::core::pipeline::RunOptions;

/// Checks a flight search site once and emails when the lowest fare is at
/// or below the configured threshold.
#[derive(Debug, Parser)]
#[command(name = "fare-watcher", version, about)]
pub struct Cli {
    /// INI file with the [FLIGHTS] search and optional site overrides
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Dotenv file holding the alert credentials
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Search each outbound date separately and report a low per day
    #[arg(long)]
    pub per_day: bool,

    /// Log the alert instead of sending it
    #[arg(long)]
    pub dry_run: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Also write a daily rolling log file into this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Raise the default log level to debug
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            per_day: self.per_day,
        }
    }
}
