//! Error types for the assembly orchestrator.

use crate::Stage;
use thiserror::Error;

/// Cross-consistency violation detected before packaging.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The simulation name cannot be used as a directory name.
    #[error("invalid simulation name {0:?}: must be non-empty without whitespace or path separators")]
    InvalidName(String),

    /// The point of interest lies outside the coordinate frame.
    #[error("point of interest ({x}, {y}) lies outside the frame extent")]
    PoiOutsideFrame {
        /// POI easting.
        x: f64,
        /// POI northing.
        y: f64,
    },

    /// The produced rasters do not share one frame geometry.
    #[error("raster frames differ: elevation is {elevation}, land cover is {land_cover}")]
    FrameMismatch {
        /// Elevation frame description.
        elevation: String,
        /// Land-cover frame description.
        land_cover: String,
    },

    /// A land-cover code in the grid has no legend entry.
    #[error("land-cover legend is missing an entry for code {0}")]
    LegendUnresolved(i32),

    /// No forcing station survived selection.
    #[error("no forcing station selected")]
    NoStations,
}

/// Failure of one pipeline stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// Grid or region failure.
    #[error(transparent)]
    Grid(#[from] a3dprep_grid::GridError),

    /// Elevation provider failure.
    #[error(transparent)]
    Dem(#[from] a3dprep_dem::DemError),

    /// Land-cover provider failure.
    #[error(transparent)]
    LandCover(#[from] a3dprep_landcover::LandCoverError),

    /// Station selection failure.
    #[error(transparent)]
    Station(#[from] a3dprep_stations::StationError),

    /// Package validation failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// I/O failure writing the package.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was cancelled cooperatively.
    #[error("run cancelled")]
    Cancelled,
}

/// A failed assembly run: which stage failed and why.
#[derive(Debug, Error)]
#[error("assembly failed during stage {stage}: {source}")]
pub struct AssemblyError {
    /// Stage whose work failed.
    pub stage: Stage,
    /// Underlying failure.
    #[source]
    pub source: StageError,
}

impl AssemblyError {
    /// Whether the failure was a cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, StageError::Cancelled)
    }
}
