// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `specrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "specrun",
    version,
    about = "Run specifications and scenarios through an external spec runner, one at a time.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). A missing file means defaults.
    #[arg(long, value_name = "PATH", default_value = "specrun.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SPECRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Print execution results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Execute a specification file, or a scenario given as `path:line`.
    Run {
        #[arg(value_name = "TARGET")]
        target: String,
    },
    /// Execute one specification file.
    Spec {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Execute the scenario declared at a line of a specification file.
    Scenario {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// 1-based line of the scenario heading.
        #[arg(long, value_name = "N")]
        line: u32,
    },
    /// Execute every specification in the specs directory.
    All {
        /// Override `[project].specs_dir`.
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
    /// Re-run the scenarios that failed last time.
    Failed,
    /// Interactive session reading commands from stdin.
    Session,
    /// Parse + validate the config and print it, without executing anything.
    ShowConfig,
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
