//! Size-based rotation of the daemon's stdout/stderr log files.
//!
//! launchd appends to `logs/daemon.log` and `logs/daemon-err.log` forever, so
//! the loop rotates them on every wake:
//! `daemon.log → daemon.log.1 → … → daemon.log.<max_files>` (oldest dropped).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use belfry_core::Layout;

/// Rotate once a log reaches 10 MiB.
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Rotated copies kept per log.
pub const MAX_ROTATED_FILES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_LOG_BYTES,
            max_files: MAX_ROTATED_FILES,
        }
    }
}

impl RotationPolicy {
    /// Rotate `log` if it has reached `max_bytes`. Returns whether it rotated.
    /// A missing log is not an error.
    pub fn rotate(&self, log: &Path) -> io::Result<bool> {
        let size = match fs::metadata(log) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err),
        };
        if size < self.max_bytes || self.max_files == 0 {
            return Ok(false);
        }

        let oldest = backup_path(log, self.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..self.max_files).rev() {
            let from = backup_path(log, n);
            if from.exists() {
                fs::rename(&from, backup_path(log, n + 1))?;
            }
        }
        fs::rename(log, backup_path(log, 1))?;
        fs::File::create(log)?;
        Ok(true)
    }
}

/// Rotate both daemon logs under `layout`. Failures are logged, never raised.
pub fn rotate_logs(layout: &Layout, policy: &RotationPolicy) {
    for log in [layout.stdout_log_path(), layout.stderr_log_path()] {
        match policy.rotate(&log) {
            Ok(true) => tracing::info!(path = %log.display(), "log file rotated"),
            Ok(false) => {}
            Err(err) => tracing::warn!(path = %log.display(), error = %err, "log rotation failed"),
        }
    }
}

/// `daemon.log` → `daemon.log.<n>`
fn backup_path(log: &Path, n: usize) -> PathBuf {
    let name = log
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "daemon.log".to_string());
    log.with_file_name(format!("{name}.{n}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SMALL: RotationPolicy = RotationPolicy {
        max_bytes: 16,
        max_files: 3,
    };

    #[test]
    fn small_or_missing_logs_are_left_alone() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("daemon.log");
        assert!(!SMALL.rotate(&log).unwrap());

        fs::write(&log, "short").unwrap();
        assert!(!SMALL.rotate(&log).unwrap());
        assert!(!backup_path(&log, 1).exists());
    }

    #[test]
    fn oversized_log_moves_to_first_backup() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("daemon.log");
        fs::write(&log, "x".repeat(32)).unwrap();

        assert!(SMALL.rotate(&log).unwrap());
        assert_eq!(fs::metadata(&log).unwrap().len(), 0);
        assert_eq!(fs::read_to_string(backup_path(&log, 1)).unwrap().len(), 32);
    }

    #[test]
    fn backups_shift_and_oldest_is_dropped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("daemon.log");

        for round in 1..=4 {
            fs::write(&log, format!("round-{round}-").repeat(4)).unwrap();
            SMALL.rotate(&log).unwrap();
        }

        assert!(fs::read_to_string(backup_path(&log, 1)).unwrap().starts_with("round-4"));
        assert!(fs::read_to_string(backup_path(&log, 3)).unwrap().starts_with("round-2"));
        assert!(!backup_path(&log, 4).exists());
    }

    #[test]
    fn rotate_logs_handles_missing_logs_dir() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path().join(".belfry"));
        rotate_logs(&layout, &RotationPolicy::default());
        assert!(!layout.logs_dir().exists());
    }
}
