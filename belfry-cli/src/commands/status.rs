//! `belfry status`: settings, last chime, and what rings next.

use std::fs;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use belfry_core::{config, state, Command, Layout};
use belfry_daemon::{schedule_next, seconds_until, strike_count};

/// Arguments for `belfry status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    enabled: bool,
    volume: u8,
    active_hours: String,
    bell_sound: String,
    bell_sound_exists: bool,
    last_chimed_hour: Option<u8>,
    last_run_timestamp: Option<String>,
    next_chime: Option<String>,
    next_strikes: Option<u32>,
    seconds_until_next: Option<f64>,
    pending_command: Option<String>,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "setting")]
    setting: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

impl StatusArgs {
    pub fn run(self, layout: &Layout) -> Result<()> {
        let report = build_report(layout, Local::now());
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(layout, report);
        Ok(())
    }
}

fn build_report(layout: &Layout, now: DateTime<Local>) -> StatusReport {
    let cfg = config::load(layout);
    let run_state = state::load(layout);

    let next = if cfg.enabled {
        schedule_next(&cfg.active_hours, &run_state, &now)
    } else {
        None
    };

    StatusReport {
        enabled: cfg.enabled,
        volume: cfg.volume.get(),
        active_hours: cfg.active_hours.to_string(),
        bell_sound: cfg.bell_sound.display().to_string(),
        bell_sound_exists: cfg.bell_sound.is_file(),
        last_chimed_hour: run_state.last_chimed_hour,
        last_run_timestamp: run_state.last_run_timestamp.map(|t| t.to_rfc3339()),
        next_chime: next.as_ref().map(|n| n.at.to_rfc3339()),
        next_strikes: next.as_ref().map(|n| strike_count(n.hour)),
        seconds_until_next: next.as_ref().map(|n| seconds_until(&n.at, &now)),
        pending_command: peek_command(layout),
    }
}

/// Read the slot without consuming it.
fn peek_command(layout: &Layout) -> Option<String> {
    let raw = fs::read_to_string(layout.command_path()).ok()?;
    match Command::from_token(&raw.trim().to_lowercase()) {
        Command::None => None,
        other => Some(other.to_string()),
    }
}

fn print_table(layout: &Layout, report: StatusReport) {
    let state_label = if report.enabled {
        "ENABLED".green().bold()
    } else {
        "DISABLED".yellow().bold()
    };
    println!("Belfry v{} | {}", env!("CARGO_PKG_VERSION"), state_label);

    let next = match (&report.next_chime, report.next_strikes, report.seconds_until_next) {
        (Some(at), Some(strikes), Some(secs)) => {
            format!("{at} ({strikes} strikes, in {})", format_wait(secs))
        }
        _ if !report.enabled => "off".to_string(),
        _ => "no eligible hour".red().to_string(),
    };
    let sound = if report.bell_sound_exists {
        report.bell_sound.clone()
    } else {
        format!("{} {}", report.bell_sound, "(missing)".red())
    };

    let rows = vec![
        StatusRow {
            setting: "volume",
            value: report.volume.to_string(),
        },
        StatusRow {
            setting: "active hours",
            value: report.active_hours.clone(),
        },
        StatusRow {
            setting: "bell sound",
            value: sound,
        },
        StatusRow {
            setting: "last chime",
            value: match (report.last_chimed_hour, &report.last_run_timestamp) {
                (Some(hour), Some(at)) => format!("{hour}:00 at {at}"),
                (Some(hour), None) => format!("{hour}:00"),
                _ => "never".to_string(),
            },
        },
        StatusRow {
            setting: "next chime",
            value: next,
        },
        StatusRow {
            setting: "pending command",
            value: report.pending_command.clone().unwrap_or_else(|| "none".to_string()),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{}", format!("files: {}", layout.root().display()).bright_black());
}

fn format_wait(secs: f64) -> String {
    let total = secs.round() as u64;
    let (hours, minutes) = (total / 3600, (total % 3600) / 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}
