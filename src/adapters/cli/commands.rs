//! CLI Command Definitions
//!
//! Argument structures for every butters-pairs command.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Butters Pairs - Statistical Arbitrage Pair Trading Engine
#[derive(Parser, Debug)]
#[command(
    name = "butters-pairs",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Statistical arbitrage pair trading engine",
    long_about = "Butters Pairs screens a sector-partitioned universe for cointegrated, \
                  mean-reverting pairs and trades their spreads on z-score thresholds \
                  under a gross exposure cap."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one screening cycle and print the shortlist
    Screen(ScreenCmd),

    /// Replay a price file through the full strategy with paper execution
    Run(RunCmd),

    /// Write a synthetic price file with embedded cointegrated pairs
    Simulate(SimulateCmd),

    /// Validate a configuration file
    CheckConfig(CheckConfigCmd),
}

/// Report output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Screen a universe
#[derive(Parser, Debug)]
pub struct ScreenCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Price file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub prices: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Paper replay
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Price file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub prices: PathBuf,

    /// Period to start trading from (defaults to the screening lookback)
    #[arg(long, value_name = "PERIOD")]
    pub start: Option<usize>,
}

/// Generate synthetic prices
#[derive(Parser, Debug)]
pub struct SimulateCmd {
    /// Output price file
    #[arg(short, long, value_name = "FILE")]
    pub out: PathBuf,

    /// Number of sectors
    #[arg(long, default_value = "3")]
    pub sectors: usize,

    /// Assets per sector
    #[arg(long, default_value = "4")]
    pub assets_per_sector: usize,

    /// Number of periods
    #[arg(long, default_value = "1000")]
    pub periods: usize,

    /// Random seed
    #[arg(long, default_value = "7")]
    pub seed: u64,

    /// Half-life of the embedded spreads
    #[arg(long, default_value = "12.0")]
    pub half_life: f64,
}

/// Validate configuration
#[derive(Parser, Debug)]
pub struct CheckConfigCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,
}
