//! Bell playback through the platform's command-line audio player.
//!
//! Decoding and mixing are the player program's job. Every failure is logged
//! here and swallowed: a broken speaker must never stop the schedule.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::Duration;

use belfry_core::Volume;

/// Pause between consecutive strikes of one chime.
pub const STRIKE_INTERVAL: Duration = Duration::from_secs(2);

/// Environment variable naming an alternative player program.
pub const PLAYER_ENV: &str = "BELFRY_PLAYER";

/// Plays the bell. Implementations block until the last strike finishes and
/// never propagate errors.
pub trait Player {
    fn play(&self, sound: &Path, volume: Volume, count: u32, interval: Duration);
}

impl<T: Player + ?Sized> Player for &T {
    fn play(&self, sound: &Path, volume: Volume, count: u32, interval: Duration) {
        (**self).play(sound, volume, count, interval)
    }
}

/// How the player program expects its volume argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFlag {
    /// `afplay -v <0.0..1.0>`
    Afplay,
    /// `paplay --volume=<0..65536>`
    Paplay,
    /// Program takes only the sound path.
    Plain,
}

/// Runs an external program once per strike.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: PathBuf,
    flag: VolumeFlag,
}

impl CommandPlayer {
    pub fn new(program: impl Into<PathBuf>, flag: VolumeFlag) -> Self {
        Self {
            program: program.into(),
            flag,
        }
    }

    /// `$BELFRY_PLAYER` if set, else `afplay` on macOS and `paplay` elsewhere.
    pub fn detect() -> Self {
        if let Some(program) = std::env::var_os(PLAYER_ENV).filter(|v| !v.is_empty()) {
            let program = PathBuf::from(program);
            let flag = match program.file_name().and_then(|n| n.to_str()) {
                Some("afplay") => VolumeFlag::Afplay,
                Some("paplay") => VolumeFlag::Paplay,
                _ => VolumeFlag::Plain,
            };
            return Self::new(program, flag);
        }
        if cfg!(target_os = "macos") {
            Self::new("afplay", VolumeFlag::Afplay)
        } else {
            Self::new("paplay", VolumeFlag::Paplay)
        }
    }

    /// Arguments for one strike of `sound` at `volume`.
    pub fn args(&self, sound: &Path, volume: Volume) -> Vec<String> {
        let sound = sound.display().to_string();
        match self.flag {
            VolumeFlag::Afplay => {
                vec!["-v".to_string(), format!("{:.2}", volume.fraction()), sound]
            }
            VolumeFlag::Paplay => {
                let level = (volume.fraction() * 65536.0).round() as u32;
                vec![format!("--volume={level}"), sound]
            }
            VolumeFlag::Plain => vec![sound],
        }
    }

    fn strike(&self, sound: &Path, volume: Volume) -> Result<(), String> {
        let output = Command::new(&self.program)
            .args(self.args(sound, volume))
            .stdin(Stdio::null())
            .output()
            .map_err(|err| format!("failed to run {}: {err}", self.program.display()))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(format!(
            "{} exited with {}: {}",
            self.program.display(),
            output.status,
            stderr
        ))
    }
}

impl Player for CommandPlayer {
    fn play(&self, sound: &Path, volume: Volume, count: u32, interval: Duration) {
        if !sound.is_file() {
            tracing::error!(sound = %sound.display(), "bell sound not found; skipping playback");
            return;
        }
        for strike in 1..=count {
            if let Err(err) = self.strike(sound, volume) {
                tracing::error!(strike, count, error = %err, "bell playback failed");
                return;
            }
            if strike < count {
                sleep(interval);
            }
        }
    }
}
