//! Coordinate frame shared by every raster in a simulation package.
//!
//! The frame is the pipeline's central correctness contract: the elevation
//! and land-cover grids, the POI check and the generated configuration all
//! refer to one frame with identical origin, cell size, dimensions and CRS.
//! It is derived once from the region of interest and then only passed
//! around by reference.

use crate::{GridError, Result, Roi};
use serde::Serialize;

/// Default ceiling on the number of cells a frame may contain.
///
/// Guards against a small resolution over a large region exhausting memory;
/// 16 million cells is a 100 km x 100 km region at 25 m.
pub const DEFAULT_MAX_CELLS: usize = 16_000_000;

/// Grid geometry: origin, cell size, dimensions and CRS.
///
/// The origin is the lower-left (south-west) corner of the grid, matching
/// the ARC ASCII `xllcorner`/`yllcorner` convention. Cell values are stored
/// row-major from the north edge southward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinateFrame {
    /// Easting of the lower-left corner.
    pub origin_x: f64,
    /// Northing of the lower-left corner.
    pub origin_y: f64,
    /// Cell edge length in CRS units (metres for projected frames).
    pub cell_size: f64,
    /// Number of columns (west to east).
    pub ncols: usize,
    /// Number of rows (north to south).
    pub nrows: usize,
    /// EPSG code of the CRS the frame is expressed in.
    pub epsg: u32,
}

impl CoordinateFrame {
    /// Derive a frame covering `roi` at the requested resolution.
    ///
    /// The extent is rounded *outward* to whole cells so the frame fully
    /// covers the region with no partial pixel at the boundary.
    pub fn from_roi(roi: &Roi, cell_size: f64) -> Result<Self> {
        Self::from_roi_with_limit(roi, cell_size, DEFAULT_MAX_CELLS)
    }

    /// Same as [`from_roi`](Self::from_roi) with an explicit cell-count limit.
    pub fn from_roi_with_limit(roi: &Roi, cell_size: f64, max_cells: usize) -> Result<Self> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(GridError::InvalidRegion(format!(
                "resolution must be a positive number of CRS units per cell, got {cell_size}"
            )));
        }

        let origin_x = (roi.min_x / cell_size).floor() * cell_size;
        let origin_y = (roi.min_y / cell_size).floor() * cell_size;
        let snapped_max_x = (roi.max_x / cell_size).ceil() * cell_size;
        let snapped_max_y = (roi.max_y / cell_size).ceil() * cell_size;

        let ncols = ((snapped_max_x - origin_x) / cell_size).round() as usize;
        let nrows = ((snapped_max_y - origin_y) / cell_size).round() as usize;
        if ncols == 0 || nrows == 0 {
            return Err(GridError::InvalidRegion(format!(
                "region collapses to {ncols}x{nrows} cells at {cell_size} units per cell"
            )));
        }
        if ncols.saturating_mul(nrows) > max_cells {
            return Err(GridError::GridTooLarge {
                ncols,
                nrows,
                max_cells,
            });
        }

        Ok(Self {
            origin_x,
            origin_y,
            cell_size,
            ncols,
            nrows,
            epsg: roi.epsg,
        })
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.ncols * self.nrows
    }

    /// Extent of the frame as `(min_x, min_y, max_x, max_y)`.
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        (
            self.origin_x,
            self.origin_y,
            self.origin_x + self.ncols as f64 * self.cell_size,
            self.origin_y + self.nrows as f64 * self.cell_size,
        )
    }

    /// Check whether a coordinate lies inside the frame extent (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (min_x, min_y, max_x, max_y) = self.extent();
        x >= min_x && x <= max_x && y >= min_y && y <= max_y
    }

    /// Centre coordinate of the cell at `(col, row)`, row 0 at the north edge.
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.cell_size;
        let y = self.origin_y + (self.nrows as f64 - row as f64 - 0.5) * self.cell_size;
        (x, y)
    }

    /// Row-major index of the cell at `(col, row)`.
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.ncols + col
    }

    /// True when `other` describes the identical grid geometry.
    pub fn same_geometry(&self, other: &CoordinateFrame) -> bool {
        self == other
    }
}

impl std::fmt::Display for CoordinateFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} cells at {} units/cell, origin ({}, {}), EPSG:{}",
            self.ncols, self.nrows, self.cell_size, self.origin_x, self.origin_y, self.epsg
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_kilometre_box_at_25m_gives_40x40() {
        let roi = Roi::around(2_780_000.0, 1_190_000.0, 1000.0, 2056).unwrap();
        let frame = CoordinateFrame::from_roi(&roi, 25.0).unwrap();
        assert_eq!(frame.ncols, 40);
        assert_eq!(frame.nrows, 40);
        assert_eq!(frame.epsg, 2056);
        assert_eq!(frame.cell_count(), 1600);
    }

    #[test]
    fn extent_is_rounded_outward_to_whole_cells() {
        // Bounds deliberately not aligned to the 25 m lattice.
        let roi = Roi::new(110.0, 210.0, 990.0, 890.0, 2056).unwrap();
        let frame = CoordinateFrame::from_roi(&roi, 25.0).unwrap();
        assert_eq!(frame.origin_x, 100.0);
        assert_eq!(frame.origin_y, 200.0);
        let (_, _, max_x, max_y) = frame.extent();
        assert!(max_x >= roi.max_x);
        assert!(max_y >= roi.max_y);
        // No partial pixel: the snapped extent is on the lattice.
        assert_eq!(max_x, 1000.0);
        assert_eq!(max_y, 900.0);
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let roi = Roi::new(0.0, 0.0, 100_000.0, 100_000.0, 2056).unwrap();
        let err = CoordinateFrame::from_roi_with_limit(&roi, 1.0, 1_000_000).unwrap_err();
        assert!(matches!(err, GridError::GridTooLarge { .. }));
    }

    #[test]
    fn non_positive_resolution_is_rejected() {
        let roi = Roi::new(0.0, 0.0, 100.0, 100.0, 2056).unwrap();
        assert!(CoordinateFrame::from_roi(&roi, 0.0).is_err());
        assert!(CoordinateFrame::from_roi(&roi, -5.0).is_err());
    }

    #[test]
    fn cell_centers_run_north_to_south() {
        let roi = Roi::new(0.0, 0.0, 100.0, 100.0, 2056).unwrap();
        let frame = CoordinateFrame::from_roi(&roi, 50.0).unwrap();
        // Row 0 is the north row.
        assert_eq!(frame.cell_center(0, 0), (25.0, 75.0));
        assert_eq!(frame.cell_center(1, 1), (75.0, 25.0));
    }

    #[test]
    fn same_geometry_detects_mismatch() {
        let roi = Roi::new(0.0, 0.0, 100.0, 100.0, 2056).unwrap();
        let a = CoordinateFrame::from_roi(&roi, 25.0).unwrap();
        let b = CoordinateFrame::from_roi(&roi, 25.0).unwrap();
        let c = CoordinateFrame::from_roi(&roi, 50.0).unwrap();
        assert!(a.same_geometry(&b));
        assert!(!a.same_geometry(&c));
    }
}
