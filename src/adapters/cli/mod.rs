//! CLI Adapter
//!
//! Command-line interface for butters-pairs.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CheckConfigCmd, CliApp, Command, OutputFormat, RunCmd, ScreenCmd, SimulateCmd};
