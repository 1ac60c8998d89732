// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::ConfigFormat;

/// Command-line arguments for `connector-cycle`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "connector-cycle",
    version,
    about = "Periodically run connector programs and store their results.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the connectors settings file (JSON or TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = crate::config::default_config_path())]
    pub config: PathBuf,

    /// Settings file format. Guessed from the extension when omitted.
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub format: Option<ConfigFormat>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONNECTOR_CYCLE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print connectors, but don't launch anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Run every connector once, wait for all results, then exit.
    #[arg(long)]
    pub once: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
