//! Command-line interface definitions.

pub mod check;
pub mod count;
pub mod watch;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// livetally - live row-count synchronizer with polling fallback.
#[derive(Parser, Debug)]
#[command(name = "livetally")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the configured table and print each count update
    Watch(ConfigPathArg),

    /// Run a single count-only query and exit
    Count(ConfigPathArg),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `livetally check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
    /// Test REST and websocket connectivity to the backend
    Connection(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "livetally.toml")]
    pub config: PathBuf,
}
