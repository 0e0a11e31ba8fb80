//! Filesystem layout.
//!
//! ```text
//! <root>/                 (~/.belfry by default, or $BELFRY_HOME)
//!   config.json
//!   state.json
//!   command.txt
//!   assets/bell.wav
//!   logs/daemon.log
//!   logs/daemon-err.log
//! ```
//!
//! A [`Layout`] is built once at startup and passed by reference to every
//! store, so tests can point the whole daemon at a `TempDir`.

use std::path::{Path, PathBuf};

use crate::error::StoreError;

pub const ROOT_DIR: &str = ".belfry";
pub const ROOT_ENV: &str = "BELFRY_HOME";

pub const CONFIG_FILE: &str = "config.json";
pub const STATE_FILE: &str = "state.json";
pub const COMMAND_FILE: &str = "command.txt";
pub const BELL_FILE: &str = "bell.wav";

pub const DAEMON_STDOUT_LOG: &str = "daemon.log";
pub const DAEMON_STDERR_LOG: &str = "daemon-err.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Layout rooted directly at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<home>/.belfry`
    pub fn from_home(home: &Path) -> Self {
        Self::new(home.join(ROOT_DIR))
    }

    /// `$BELFRY_HOME` if set, otherwise `~/.belfry`.
    pub fn discover() -> Result<Self, StoreError> {
        if let Some(root) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(root));
        }
        let home = dirs::home_dir().ok_or(StoreError::HomeNotFound)?;
        Ok(Self::from_home(&home))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    pub fn command_path(&self) -> PathBuf {
        self.root.join(COMMAND_FILE)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn default_bell_path(&self) -> PathBuf {
        self.assets_dir().join(BELL_FILE)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn stdout_log_path(&self) -> PathBuf {
        self.logs_dir().join(DAEMON_STDOUT_LOG)
    }

    pub fn stderr_log_path(&self) -> PathBuf {
        self.logs_dir().join(DAEMON_STDERR_LOG)
    }
}
