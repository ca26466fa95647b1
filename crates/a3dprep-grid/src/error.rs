//! Error types for the grid crate.

use thiserror::Error;

/// Errors that can occur when constructing or writing grids.
#[derive(Debug, Error)]
pub enum GridError {
    /// The region of interest is degenerate or would produce an unusable grid.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// The requested resolution would exceed the configured maximum cell count.
    #[error("grid of {ncols}x{nrows} cells exceeds the maximum of {max_cells} cells")]
    GridTooLarge {
        /// Columns the frame would have.
        ncols: usize,
        /// Rows the frame would have.
        nrows: usize,
        /// Configured cell-count ceiling.
        max_cells: usize,
    },

    /// A raster payload does not match its coordinate frame.
    #[error("raster has {actual} values but the frame requires {expected}")]
    DimensionMismatch {
        /// Cell count required by the frame.
        expected: usize,
        /// Cell count actually supplied.
        actual: usize,
    },

    /// A land-cover code appears in a grid without a legend entry.
    #[error("land-cover code {0} is not present in the legend")]
    CodeNotInLegend(i32),

    /// Coordinate reference system not supported by the planar transforms.
    #[error("unsupported coordinate reference system EPSG:{0}")]
    UnsupportedCrs(u32),

    /// Unknown coordinate-system name.
    #[error("unknown coordinate system {0:?} (supported: CH1903+, CH1903, WGS84, CHTRS95)")]
    UnknownCoordSys(String),

    /// I/O error writing a grid file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
