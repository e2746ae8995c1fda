// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{Configuration, Platform};

/// Command-line arguments for `simrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "simrun",
    version,
    about = "Build, launch and watch apps on the simulator.",
    long_about = None
)]
pub struct CliArgs {
    /// Echo every external command before running it.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SIMRUN_LOG` or `warn` is used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Simrun.toml` in the current directory, if present.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build, install and launch on a simulator, then stream its logs.
    Run(RunArgs),
    /// Build the project.
    Build(BuildArgs),
    /// Manage simulators.
    #[command(subcommand)]
    Devices(DevicesCommand),
    /// Inspect the project in the current directory.
    #[command(subcommand)]
    Project(ProjectCommand),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Target platform (ios, watchos, tvos, visionos).
    pub platform: Platform,

    /// Rebuild and relaunch when sources change.
    #[arg(short, long)]
    pub watch: bool,

    #[arg(short, long)]
    pub scheme: Option<String>,

    /// Simulator name or identifier.
    #[arg(short, long)]
    pub device: Option<String>,

    /// Build configuration (debug, release).
    #[arg(short, long)]
    pub configuration: Option<Configuration>,

    /// Arguments passed to the launched app.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    #[arg(short, long)]
    pub scheme: Option<String>,

    #[arg(short, long)]
    pub configuration: Option<Configuration>,

    #[arg(short, long)]
    pub platform: Option<Platform>,

    /// Explicit build destination; otherwise the platform default.
    #[arg(long)]
    pub destination: Option<String>,

    /// Clean before building.
    #[arg(long)]
    pub clean: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum DevicesCommand {
    /// List available simulators.
    List {
        #[arg(short, long)]
        platform: Option<Platform>,
        /// Only booted simulators.
        #[arg(long)]
        booted: bool,
        #[arg(long)]
        json: bool,
    },
    /// Boot a simulator.
    Boot { device: String },
    /// Shut down a simulator, or `all`.
    Shutdown { device: Option<String> },
    /// Create a simulator from a device type and runtime.
    Create {
        name: String,
        /// Device type name or identifier (e.g. "iPhone 17 Pro").
        device_type: String,
        /// Runtime name or identifier (e.g. "iOS 26").
        runtime: String,
    },
    /// Delete a simulator.
    Delete { device: String },
    /// List device types.
    Types {
        #[arg(short, long)]
        platform: Option<Platform>,
    },
    /// List installed runtimes.
    Runtimes {
        #[arg(short, long)]
        platform: Option<Platform>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProjectCommand {
    /// Show the detected project, schemes and targets.
    Info {
        #[arg(long)]
        json: bool,
    },
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
