//! Error types for the elevation provider.

use thiserror::Error;

/// Errors that can occur while producing an elevation grid.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),

    /// Invalid zoom level for the tile pyramid.
    #[error("invalid zoom level {0} (must be 1-14)")]
    InvalidZoomLevel(u8),

    /// The remote tile source could not be reached after retry.
    #[error("tile source unavailable: {what}: {reason}")]
    SourceUnavailable {
        /// Operation that failed.
        what: String,
        /// Failure description, including the attempt count.
        reason: String,
    },

    /// No cell of the frame received a valid elevation.
    #[error("no elevation data covers the requested frame")]
    NoCoverage,

    /// Cache failure while fetching tiles.
    #[error(transparent)]
    Cache(#[from] a3dprep_cache::CacheError),

    /// Grid construction failure.
    #[error(transparent)]
    Grid(#[from] a3dprep_grid::GridError),
}

impl From<a3dprep_cache::RetryExhausted> for DemError {
    fn from(err: a3dprep_cache::RetryExhausted) -> Self {
        DemError::SourceUnavailable {
            what: err.what.clone(),
            reason: format!("after {} attempts: {}", err.attempts, err.last_error),
        }
    }
}
