//! Engine error types.
//!
//! Executor failures travel through [`EngineError::Scan`] unchanged; the
//! remaining variants are raised by the engine itself.

use thiserror::Error;

use crate::scan::ScanError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by [`MultiCounter`](crate::engine::MultiCounter).
#[derive(Error, Debug)]
pub enum EngineError {
    /// The scan executor rejected or failed the request.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A measure whose kind or key cannot be determined.
    #[error("malformed measure: {0}")]
    MalformedMeasure(String),

    /// Two mapping keys normalized to the same key.
    #[error("measure key collision: {key:?} supplied more than once")]
    KeyCollision { key: String },

    /// The grouped scan returned more distinct rows than the configured limit.
    #[error("grouped scan returned {rows} distinct rows, above the limit of {limit}")]
    CardinalityExceeded { rows: usize, limit: usize },
}

impl EngineError {
    /// Create a malformed-measure error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMeasure(message.into())
    }

    /// Check if this error originated in the scan executor.
    pub fn is_scan_error(&self) -> bool {
        matches!(self, Self::Scan(_))
    }
}
