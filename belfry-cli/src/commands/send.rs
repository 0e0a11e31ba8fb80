//! `belfry send`: drop a command into the daemon's mailbox.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use belfry_core::{Command, Layout};
use belfry_daemon::command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SendKind {
    /// Re-read config.json and reschedule.
    Reload,
    /// Strike the bell once at the configured volume.
    Test,
    /// Stop the daemon.
    Shutdown,
}

impl From<SendKind> for Command {
    fn from(kind: SendKind) -> Self {
        match kind {
            SendKind::Reload => Command::Reload,
            SendKind::Test => Command::Test,
            SendKind::Shutdown => Command::Shutdown,
        }
    }
}

/// Arguments for `belfry send`.
#[derive(Args, Debug)]
pub struct SendArgs {
    #[arg(value_enum)]
    pub command: SendKind,
}

impl SendArgs {
    pub fn run(self, layout: &Layout) -> Result<()> {
        let command = Command::from(self.command);
        let slot = layout.command_path();
        command::send(&slot, &command)
            .with_context(|| format!("failed to write {}", slot.display()))?;
        println!("queued '{command}'; the daemon picks it up at its next wake");
        Ok(())
    }
}
