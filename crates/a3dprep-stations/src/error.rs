//! Error types for station selection.

use thiserror::Error;

/// Errors that can occur while selecting stations or materializing series.
#[derive(Debug, Error)]
pub enum StationError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The station catalog or data service could not be reached after retry.
    #[error("station service unavailable: {what}: {reason}")]
    SourceUnavailable {
        /// Operation that failed.
        what: String,
        /// Failure description, including the attempt count.
        reason: String,
    },

    /// No candidate station met the completeness threshold.
    ///
    /// Fatal for the pipeline: the solver needs at least one forcing station.
    #[error(
        "no station qualifies: {considered} candidates, none with completeness >= {threshold}"
    )]
    NoStationsAvailable {
        /// Candidates considered before filtering.
        considered: usize,
        /// Completeness threshold that none reached.
        threshold: f64,
    },

    /// The requested date range is inverted or empty.
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    /// Malformed catalog or time-series payload.
    #[error("malformed station payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// Cache failure while fetching catalog data.
    #[error(transparent)]
    Cache(#[from] a3dprep_cache::CacheError),

    /// Coordinate transform failure.
    #[error(transparent)]
    Grid(#[from] a3dprep_grid::GridError),
}

impl From<a3dprep_cache::RetryExhausted> for StationError {
    fn from(err: a3dprep_cache::RetryExhausted) -> Self {
        StationError::SourceUnavailable {
            what: err.what.clone(),
            reason: format!("after {} attempts: {}", err.attempts, err.last_error),
        }
    }
}
