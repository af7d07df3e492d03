//! Error types for the narrator core.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for narrator operations
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors surfaced to callers of the narrator core.
///
/// Per-chunk synthesis failures are not represented here: playback recovers
/// from them locally and only logs them.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The text source was unavailable or produced malformed input
    #[error("document load failed: {0}")]
    DocumentLoad(String),

    /// The synthesis backend never reported ready within the startup window
    #[error("speech backend unavailable after waiting {}ms", waited.as_millis())]
    BackendUnavailable { waited: Duration },

    /// A voice id that is not part of the current catalog
    #[error("unknown voice: {0}")]
    UnknownVoice(String),

    /// Speech rate must be a positive finite number
    #[error("invalid speech rate: {0}")]
    InvalidRate(f32),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
