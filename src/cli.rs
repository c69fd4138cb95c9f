// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `scriptd`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scriptd",
    version,
    about = "Run registered scripts on demand and trigger them over TCP.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path(), global = true)]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCRIPTD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// What to do; runs the daemon when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the daemon: supervisor, console output and trigger server.
    Serve(ServeArgs),
    /// Send a trigger message to a running daemon and print the reply.
    Send(SendArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Serve(ServeArgs::default())
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// Parse + validate, print the registry, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Do not open the trigger port even if `[server].enabled` is true.
    #[arg(long)]
    pub no_server: bool,

    /// Start a script at launch, by display name or file name (repeatable).
    #[arg(long = "start", value_name = "NAME")]
    pub start: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SendArgs {
    /// The secret message, e.g. `RUN_SCRIPT_TEST`.
    pub message: String,

    /// Override `[server].host` from the config.
    #[arg(long)]
    pub host: Option<String>,

    /// Override `[server].port` from the config.
    #[arg(long)]
    pub port: Option<u16>,

    /// How long to wait for the reply, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,
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
