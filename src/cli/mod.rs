//! CLI interface for icewatch
//!
//! Provides subcommands for:
//! - `run`: Start the continuous detection engine
//! - `scan`: One-shot pass over every venue, printing alerts
//! - `status`: Show configured venues and watchlist sizes
//! - `config`: Show effective configuration

mod run;
mod scan;

pub use run::RunArgs;
pub use scan::ScanArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "icewatch")]
#[command(about = "Multi-venue silent-accumulation detection and alerting engine")]
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
    /// Start the continuous detection engine
    Run(RunArgs),
    /// One-shot scan across every configured venue
    Scan(ScanArgs),
    /// Show configured venues and watchlist sizes
    Status,
    /// Show effective configuration
    Config,
}
