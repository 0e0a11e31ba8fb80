//! `belfry config`: view and edit `config.json`.
//!
//! Edits go through the Configuration Store, so the file is normalized on the
//! way in, and then queue a `reload` for the daemon unless `--no-reload` is
//! given.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use belfry_core::{config, ActiveHours, Command, Config, Layout, Volume};
use belfry_daemon::command;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the normalized settings as JSON.
    Show,
    /// Allow chiming.
    Enable(ReloadFlag),
    /// Stop chiming without stopping the daemon.
    Disable(ReloadFlag),
    /// Set the playback volume (0-100).
    Volume {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        level: u8,
        #[command(flatten)]
        reload: ReloadFlag,
    },
    /// Set the active hours, e.g. `12-21`, `9,12,18-20`, `all`, or `none`.
    Hours {
        hours: ActiveHours,
        #[command(flatten)]
        reload: ReloadFlag,
    },
    /// Set the bell sound file.
    Sound {
        path: PathBuf,
        #[command(flatten)]
        reload: ReloadFlag,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ReloadFlag {
    /// Save only; do not queue a `reload` for the daemon.
    #[arg(long)]
    pub no_reload: bool,
}

pub fn run(command: ConfigCommand, layout: &Layout) -> Result<()> {
    let mut cfg = config::load(layout);
    let reload = match command {
        ConfigCommand::Show => {
            println!(
                "{}",
                serde_json::to_string_pretty(&cfg).context("failed to render config JSON")?
            );
            return Ok(());
        }
        ConfigCommand::Enable(flag) => {
            cfg.enabled = true;
            flag
        }
        ConfigCommand::Disable(flag) => {
            cfg.enabled = false;
            flag
        }
        ConfigCommand::Volume { level, reload } => {
            cfg.volume = Volume::clamped(i64::from(level));
            reload
        }
        ConfigCommand::Hours { hours, reload } => {
            cfg.active_hours = hours;
            reload
        }
        ConfigCommand::Sound { path, reload } => {
            let path = std::path::absolute(&path)
                .with_context(|| format!("could not resolve {}", path.display()))?;
            if !path.is_file() {
                eprintln!("warning: {} does not exist yet", path.display());
            }
            cfg.bell_sound = path;
            reload
        }
    };

    save_and_report(layout, &cfg, !reload.no_reload)
}

fn save_and_report(layout: &Layout, cfg: &Config, reload: bool) -> Result<()> {
    config::save(layout, cfg)
        .with_context(|| format!("failed to write {}", layout.config_path().display()))?;
    println!(
        "saved: enabled={} volume={} hours={} sound={}",
        cfg.enabled,
        cfg.volume,
        cfg.active_hours,
        cfg.bell_sound.display()
    );

    if reload {
        command::send(&layout.command_path(), &Command::Reload)
            .context("failed to queue reload")?;
        println!("queued 'reload'");
    } else {
        println!("not queued; run `belfry send reload` when the daemon should pick this up");
    }
    Ok(())
}
