//! Single-slot command mailbox backed by `command.txt`.
//!
//! Producers overwrite the file with one token; the daemon reads it and
//! truncates it to acknowledge. Only the latest command matters, and a
//! partially written token simply reads as unrecognized.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

use belfry_core::Command;

use crate::error::{io_err, DaemonError};

/// Consume the pending command, if any.
///
/// Never fails: any I/O problem reads as [`Command::None`].
pub fn check(path: &Path) -> Command {
    match take(path) {
        Ok(Some(token)) => Command::from_token(&token),
        Ok(None) => Command::None,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "command slot unreadable");
            Command::None
        }
    }
}

fn take(path: &Path) -> io::Result<Option<String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    fs::write(path, b"")?;
    Ok(Some(raw.trim().to_lowercase()))
}

/// Place `command` in the slot, replacing whatever was pending.
pub fn send(path: &Path, command: &Command) -> Result<(), DaemonError> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
    }
    fs::write(path, format!("{}\n", command.token())).map_err(|e| io_err(path, e))
}
