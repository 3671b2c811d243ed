//! Error types for review-core.

use crate::types::Fingerprint;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ReviewError.
pub type Result<T> = std::result::Result<T, ReviewError>;

/// Errors surfaced by the review engine.
///
/// None of these end a review session; callers log them and carry on with the
/// state they already have.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid span {value:?}: expected '<number> <unit>'")]
    InvalidSpan { value: String },

    #[error("span table is empty")]
    EmptySpanTable,

    #[error("migration aborted: fingerprint {fingerprint} has no history (already upgraded?)")]
    MigrationAborted { fingerprint: Fingerprint },

    #[error("background resync task is not running")]
    TimerClosed,
}

impl ReviewError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
