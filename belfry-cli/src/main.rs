//! Belfry: an hourly bell that only rings when you want it to.
//!
//! # Usage
//!
//! ```text
//! belfry daemon start|install|uninstall|logs
//! belfry send reload|test|shutdown
//! belfry status [--json]
//! belfry config show
//! belfry config enable|disable [--no-reload]
//! belfry config volume <0-100> [--no-reload]
//! belfry config hours <12-21|9,12,18-20|all|none> [--no-reload]
//! belfry config sound <path> [--no-reload]
//! ```
//!
//! Files live under `~/.belfry`, or `$BELFRY_HOME` when set.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use belfry_core::Layout;
use commands::{config::ConfigCommand, daemon::DaemonCommand, send::SendArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "belfry",
    version,
    about = "Chime a bell every hour, within the hours you choose",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run or manage the bell daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Send a control command to the running daemon.
    Send(SendArgs),

    /// Show settings, last chime, and the next scheduled chime.
    Status(StatusArgs),

    /// Inspect or edit the settings file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let layout = Layout::discover().context("could not locate the belfry directory")?;
    match cli.command {
        Commands::Daemon { command } => commands::daemon::run(command, &layout),
        Commands::Send(args) => args.run(&layout),
        Commands::Status(args) => args.run(&layout),
        Commands::Config { command } => commands::config::run(command, &layout),
    }
}
