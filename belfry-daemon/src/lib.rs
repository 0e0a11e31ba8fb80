//! Bell daemon: scheduler, command mailbox, playback, and the chime loop.

pub mod command;
mod error;
pub mod launchd;
pub mod log_rotation;
pub mod playback;
mod runtime;
pub mod scheduler;

pub use error::DaemonError;
pub use launchd::{generate_plist, install as install_launchd, uninstall as uninstall_launchd};
pub use playback::{CommandPlayer, Player, STRIKE_INTERVAL};
pub use runtime::{run, start_blocking, Clock, Daemon, SystemClock, POLL_INTERVAL};
pub use scheduler::{
    compute_next_chime, schedule_next, seconds_until, strike_count, ScheduledChime,
};
