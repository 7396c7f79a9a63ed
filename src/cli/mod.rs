//! Command-line interface definitions.

pub mod banner;
pub mod check;
pub mod config;
pub mod logs;
pub mod output;
pub mod run;
pub mod service;
pub mod status;
pub mod wallet;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Quotekeeper - automated market-making engine for CLOB prediction markets.
#[derive(Parser, Debug)]
#[command(name = "quotekeeper")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Quote and track fills but never place real orders
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the quoting engine (foreground, interactive)
    Run(RunArgs),

    /// Validate configuration and connectivity without starting the engine
    HealthCheck,

    /// Show service status
    Status,

    /// Tail service logs
    Logs(LogsArgs),

    /// Inspect or validate the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Wallet operations
    #[command(subcommand)]
    Wallet(WalletCommands),

    /// Manage the systemd service
    #[command(subcommand)]
    Service(ServiceCommands),
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Skip ASCII art banner
    #[arg(long)]
    pub no_banner: bool,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}

/// Arguments for the `logs` subcommand.
#[derive(Parser, Debug)]
pub struct LogsArgs {
    /// Number of lines to show
    #[arg(short = 'n', long, default_value = "50")]
    pub lines: u32,

    /// Follow log output (like tail -f)
    #[arg(short, long)]
    pub follow: bool,

    /// Show logs since (e.g., "1 hour ago", "2026-01-01")
    #[arg(long)]
    pub since: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a starter configuration file
    Init {
        /// Where to write the file
        #[arg(long, default_value = "config.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

#[derive(Subcommand, Debug)]
pub enum WalletCommands {
    /// Print the wallet address derived from `WALLET_PRIVATE_KEY`
    Address,
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommands {
    /// Install the systemd unit
    Install(InstallArgs),
    /// Remove the systemd unit
    Uninstall,
}

/// Arguments for the `service install` subcommand.
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Path to config file for the service
    #[arg(long, default_value = "/etc/quotekeeper/config.toml")]
    pub config: PathBuf,

    /// User to run the service as
    #[arg(long, default_value = "quotekeeper")]
    pub user: String,

    /// Working directory for the service
    #[arg(long, default_value = "/etc/quotekeeper")]
    pub working_dir: PathBuf,
}
