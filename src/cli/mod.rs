//! CLI interface for rulescan
//!
//! Provides subcommands for:
//! - `scan`: Run a pattern scan over CSV bar data
//! - `extract`: Extract and classify tunable parameters from scanner source
//! - `config`: Show the effective configuration

mod extract;
mod scan;

pub use extract::ExtractArgs;
pub use scan::ScanArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "rulescan")]
#[command(about = "Rule-based daily-bar market scanner")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a pattern scan over CSV bar data
    Scan(ScanArgs),
    /// Extract and classify tunable parameters from scanner source
    Extract(ExtractArgs),
    /// Show the effective configuration
    Config,
}
