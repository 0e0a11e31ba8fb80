//! The daemon loop: sleep until the next chime, sample the command slot,
//! then strike the bell and record it.
//!
//! Everything runs on one task. The sleeps are the only suspension points,
//! so a command is only seen when a sleep ends.

use std::fs;
use std::time::Duration;

use chrono::{DateTime, Local};

use belfry_core::{config, state, Command, Config, Layout, RunState};

use crate::command;
use crate::error::{io_err, DaemonError};
use crate::log_rotation::{rotate_logs, RotationPolicy};
use crate::playback::{CommandPlayer, Player, STRIKE_INTERVAL};
use crate::scheduler::{schedule_next, seconds_until, sleep_duration, strike_count, ScheduledChime};

/// Sleep between checks while disabled or while no hour is eligible.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Environment variable selecting `json` log output.
pub const LOG_FORMAT_ENV: &str = "BELFRY_LOG_FORMAT";

/// Source of wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> DateTime<Local> {
        (**self).now()
    }
}

/// Outcome of one pass through the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    Continue,
    Terminate,
}

/// The chime loop and the only owner of the in-memory [`Config`] and [`RunState`].
pub struct Daemon<'a, C, P> {
    layout: &'a Layout,
    clock: C,
    player: P,
    rotation: RotationPolicy,
    config: Config,
    state: RunState,
}

impl<'a, C: Clock, P: Player> Daemon<'a, C, P> {
    /// Load configuration and state once.
    pub fn new(layout: &'a Layout, clock: C, player: P) -> Self {
        let config = config::load(layout);
        let state = state::load(layout);
        tracing::info!(
            enabled = config.enabled,
            volume = %config.volume,
            active_hours = %config.active_hours,
            last_chimed_hour = ?state.last_chimed_hour,
            "daemon initialized"
        );
        Self {
            layout,
            clock,
            player,
            rotation: RotationPolicy::default(),
            config,
            state,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Run until a `shutdown` command arrives.
    pub async fn run(&mut self) -> Result<(), DaemonError> {
        loop {
            rotate_logs(self.layout, &self.rotation);
            if self.cycle().await? == Cycle::Terminate {
                tracing::info!("shutdown requested, daemon exiting");
                return Ok(());
            }
        }
    }

    async fn cycle(&mut self) -> Result<Cycle, DaemonError> {
        if !self.config.enabled {
            return Ok(self.poll_disabled().await);
        }

        let now = self.clock.now();
        let Some(next) = schedule_next(&self.config.active_hours, &self.state, &now) else {
            return Ok(self.poll_idle().await);
        };

        tracing::info!(
            hour = next.hour,
            next = %next.at.to_rfc3339(),
            wait_secs = seconds_until(&next.at, &now),
            "waiting for next chime"
        );
        tokio::time::sleep(sleep_duration(&next.at, &now)).await;

        match command::check(&self.layout.command_path()) {
            Command::Shutdown => return Ok(Cycle::Terminate),
            Command::Reload => {
                tracing::info!("reload requested; skipping this chime");
                self.reload();
            }
            Command::Test => {
                tracing::info!("test requested; skipping this chime");
                self.play_test();
            }
            Command::Unrecognized(token) => {
                tracing::warn!(%token, "ignoring unrecognized command");
                self.chime(&next)?;
            }
            Command::None => self.chime(&next)?,
        }
        Ok(Cycle::Continue)
    }

    /// Disabled: wait, honor `shutdown`, pick up config edits.
    async fn poll_disabled(&mut self) -> Cycle {
        tracing::debug!("chiming disabled; polling");
        tokio::time::sleep(POLL_INTERVAL).await;
        match command::check(&self.layout.command_path()) {
            Command::Shutdown => return Cycle::Terminate,
            Command::None => {}
            other => tracing::debug!(command = %other, "ignoring command while disabled"),
        }
        self.reload();
        Cycle::Continue
    }

    /// Enabled, but no hour is eligible: behave like disabled and still
    /// answer `test`.
    async fn poll_idle(&mut self) -> Cycle {
        tracing::warn!(
            active_hours = %self.config.active_hours,
            last_chimed_hour = ?self.state.last_chimed_hour,
            "no eligible hour to chime; polling"
        );
        tokio::time::sleep(POLL_INTERVAL).await;
        match command::check(&self.layout.command_path()) {
            Command::Shutdown => return Cycle::Terminate,
            Command::Test => self.play_test(),
            _ => {}
        }
        self.reload();
        Cycle::Continue
    }

    fn reload(&mut self) {
        let fresh = config::load(self.layout);
        if fresh != self.config {
            tracing::info!(
                enabled = fresh.enabled,
                volume = %fresh.volume,
                active_hours = %fresh.active_hours,
                "configuration reloaded"
            );
        }
        self.config = fresh;
    }

    fn play_test(&self) {
        self.player
            .play(&self.config.bell_sound, self.config.volume, 1, STRIKE_INTERVAL);
    }

    /// Strike the bell for the scheduled hour and persist the new [`RunState`].
    fn chime(&mut self, slot: &ScheduledChime<Local>) -> Result<(), DaemonError> {
        let hour = slot.hour;
        let strikes = strike_count(hour);
        tracing::info!(hour, strikes, volume = %self.config.volume, "chiming");
        self.player
            .play(&self.config.bell_sound, self.config.volume, strikes, STRIKE_INTERVAL);

        self.state.record_chime(hour as u8, &self.clock.now());
        state::save(self.layout, &self.state)?;
        Ok(())
    }
}

/// Start the daemon and block the current thread until it exits.
pub fn start_blocking(layout: &Layout) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(layout))
}

/// Run the daemon with the system clock and player until `shutdown` or Ctrl-C.
pub async fn run(layout: &Layout) -> Result<(), DaemonError> {
    ensure_runtime_dirs(layout)?;
    let mut daemon = Daemon::new(layout, SystemClock, CommandPlayer::detect());

    tokio::select! {
        result = daemon.run() => result,
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                tracing::info!("received ctrl-c, shutting down daemon");
                Ok(())
            }
            Err(err) => Err(io_err("ctrl-c handler", err)),
        },
    }
}

fn ensure_runtime_dirs(layout: &Layout) -> Result<(), DaemonError> {
    for dir in [layout.root().to_path_buf(), layout.logs_dir()] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let _ = if json {
        fmt().json().with_env_filter(filter).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(false).try_init()
    };
}
