//! Error types for belfry-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from persisting configuration or run state.
///
/// Loading never fails: corrupt input is replaced with defaults. Only the
/// write paths surface errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure while writing `path`.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (write path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.belfry/`.
    #[error("cannot determine home directory; set $HOME or BELFRY_HOME")]
    HomeNotFound,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
