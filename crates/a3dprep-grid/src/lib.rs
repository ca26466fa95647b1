//! # a3dprep-grid
//!
//! Grid geometry for the Alpine3D input-assembly pipeline.
//!
//! This crate holds the leaf types every other pipeline stage builds on:
//!
//! - [`Roi`] - the user-selected region of interest
//! - [`CoordinateFrame`] - the shared grid geometry all rasters must match
//! - [`ElevationGrid`] / [`LandCoverGrid`] - frame-bound raster values
//! - [`transforms`] - planar transforms between the supported CRS
//! - [`asc`] - ARC ASCII output in the format the solver reads
//!
//! ## Example
//!
//! ```
//! use a3dprep_grid::{CoordinateFrame, Roi};
//!
//! // A 1 km box around a point in the Grisons, gridded at 25 m.
//! let roi = Roi::around(2_780_000.0, 1_190_000.0, 1000.0, 2056)?;
//! let frame = CoordinateFrame::from_roi(&roi, 25.0)?;
//! assert_eq!((frame.ncols, frame.nrows), (40, 40));
//! # Ok::<(), a3dprep_grid::GridError>(())
//! ```

pub mod asc;
mod error;
mod frame;
mod grids;
mod roi;
pub mod transforms;

pub use error::GridError;
pub use frame::{CoordinateFrame, DEFAULT_MAX_CELLS};
pub use grids::{ElevationGrid, LandCoverGrid, Legend, NODATA_CLASS, NODATA_ELEVATION};
pub use roi::Roi;
pub use transforms::LatLonBounds;

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
