//! Error types for the synchronization engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the synchronization engine
///
/// Steady-state presentation paths never produce these; per-tick outcomes are
/// reported through [`TimedSampleStatus`](crate::buffer::TimedSampleStatus)
/// and boolean registration results. `Error` covers construction, parsing and
/// factory surfaces.
#[derive(Debug, Error)]
pub enum Error {
    /// Timecode string could not be parsed
    #[error("Failed to parse timecode '{value}': {reason}")]
    ParseTimecode {
        /// The rejected input
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// No factory registered for the requested source kind
    #[error("Unknown source kind: {0}")]
    UnknownSourceKind(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
