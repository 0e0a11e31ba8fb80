//! `belfry daemon`: foreground run, launchd agent, and log tailing.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use belfry_core::Layout;
use belfry_daemon::{install_launchd, start_blocking, uninstall_launchd};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the chime loop in the foreground.
    Start,
    /// Install and bootstrap the launchd agent (macOS).
    Install,
    /// Boot out and remove the launchd agent (macOS).
    Uninstall,
    /// Print recent daemon log lines.
    Logs(DaemonLogsArgs),
}

#[derive(Args, Debug)]
pub struct DaemonLogsArgs {
    /// Number of trailing lines to show.
    #[arg(long, default_value_t = 100)]
    pub lines: usize,

    /// Show only the stderr log file.
    #[arg(long)]
    pub stderr_only: bool,
}

pub fn run(command: DaemonCommand, layout: &Layout) -> Result<()> {
    match command {
        DaemonCommand::Start => {
            start_blocking(layout).context("daemon exited with error")?;
        }
        DaemonCommand::Install => {
            let home = dirs::home_dir().context("could not determine home directory")?;
            let binary = std::env::current_exe().context("could not locate belfry binary")?;
            let path = install_launchd(&home, layout, &binary)
                .context("failed to install launchd service")?;
            println!("installed launchd service: {}", path.display());
        }
        DaemonCommand::Uninstall => {
            let home = dirs::home_dir().context("could not determine home directory")?;
            uninstall_launchd(&home).context("failed to uninstall launchd service")?;
            println!("uninstalled launchd service");
        }
        DaemonCommand::Logs(args) => {
            if !args.stderr_only {
                print_tail(&layout.stdout_log_path(), args.lines)
                    .context("failed to read daemon stdout log")?;
            }
            print_tail(&layout.stderr_log_path(), args.lines)
                .context("failed to read daemon stderr log")?;
        }
    }

    Ok(())
}

fn print_tail(path: &Path, lines: usize) -> Result<()> {
    if !path.exists() {
        println!("log file not found: {}", path.display());
        return Ok(());
    }

    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut tail = VecDeque::<String>::with_capacity(lines);
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if tail.len() == lines {
            tail.pop_front();
        }
        if lines > 0 {
            tail.push_back(line);
        }
    }

    println!("==> {} <==", path.display());
    for line in tail {
        println!("{line}");
    }
    Ok(())
}
