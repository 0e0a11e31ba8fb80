//! State Store: `state.json`.
//!
//! Unlike the Configuration Store, a missing or corrupt state file is only
//! healed in memory: [`load`] never writes.

use std::fs;
use std::io::ErrorKind;

use crate::atomic::write_json;
use crate::error::StoreError;
use crate::paths::Layout;
use crate::types::RunState;

/// Load the run state, falling back to the empty default.
pub fn load(layout: &Layout) -> RunState {
    let path = layout.state_path();
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return RunState::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read state");
            return RunState::default();
        }
    };

    match serde_json::from_str::<RunState>(&contents) {
        Ok(state) if state.last_chimed_hour.map_or(true, |h| h < 24) => state,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "state has out-of-range hour; ignoring");
            RunState::default()
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "state is not valid; ignoring");
            RunState::default()
        }
    }
}

/// Overwrite the state file with `state`.
pub fn save(layout: &Layout, state: &RunState) -> Result<(), StoreError> {
    write_json(&layout.state_path(), state)
}
