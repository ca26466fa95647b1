//! Error types for the land-cover provider.

use thiserror::Error;

/// Errors that can occur while producing a land-cover grid.
#[derive(Debug, Error)]
pub enum LandCoverError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),

    /// The land-cover source could not be reached after retry.
    #[error("land-cover source unavailable: {what}: {reason}")]
    SourceUnavailable {
        /// Operation that failed.
        what: String,
        /// Failure description, including the attempt count.
        reason: String,
    },

    /// A source classification code has no entry in the class mapping.
    ///
    /// The downstream solver depends on a closed class set, so unmapped
    /// codes are fatal rather than silently dropped.
    #[error("unknown land-cover code {0} in source data")]
    UnknownCode(i32),

    /// The source returned a raster with no usable pixels for the region.
    #[error("land-cover source returned no data for the requested region")]
    EmptySource,

    /// The source raster does not hold integer class codes.
    #[error("categorical raster has non-integer samples ({0})")]
    NonCategoricalSamples(&'static str),

    /// Cache failure while fetching source data.
    #[error(transparent)]
    Cache(#[from] a3dprep_cache::CacheError),

    /// Grid construction failure.
    #[error(transparent)]
    Grid(#[from] a3dprep_grid::GridError),
}

impl From<a3dprep_cache::RetryExhausted> for LandCoverError {
    fn from(err: a3dprep_cache::RetryExhausted) -> Self {
        LandCoverError::SourceUnavailable {
            what: err.what.clone(),
            reason: format!("after {} attempts: {}", err.attempts, err.last_error),
        }
    }
}
