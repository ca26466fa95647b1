//! Raster value types bound to a coordinate frame.

use crate::{CoordinateFrame, GridError, Result};
use std::collections::BTreeMap;

/// Sentinel marking a cell with no valid elevation.
pub const NODATA_ELEVATION: f32 = -9999.0;

/// Sentinel marking a cell with no valid land-cover class.
pub const NODATA_CLASS: i32 = -9999;

/// Elevation raster over a coordinate frame, values in metres.
#[derive(Debug, Clone)]
pub struct ElevationGrid {
    frame: CoordinateFrame,
    data: Vec<f32>,
}

impl ElevationGrid {
    /// Bind elevation values to a frame.
    ///
    /// Fails when the value count does not match the frame dimensions.
    pub fn new(frame: CoordinateFrame, data: Vec<f32>) -> Result<Self> {
        if data.len() != frame.cell_count() {
            return Err(GridError::DimensionMismatch {
                expected: frame.cell_count(),
                actual: data.len(),
            });
        }
        Ok(Self { frame, data })
    }

    /// The frame this grid is aligned to.
    pub fn frame(&self) -> &CoordinateFrame {
        &self.frame
    }

    /// Raw values, row-major from the north edge.
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    /// Value at `(col, row)`, `None` for the nodata sentinel.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        let v = self.data[self.frame.index(col, row)];
        if v == NODATA_ELEVATION {
            None
        } else {
            Some(v)
        }
    }

    /// Fraction of cells holding a valid elevation.
    pub fn valid_fraction(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let valid = self.data.iter().filter(|v| **v != NODATA_ELEVATION).count();
        valid as f64 / self.data.len() as f64
    }

    /// Mean of the valid elevations, `None` when every cell is nodata.
    pub fn mean_elevation(&self) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for v in &self.data {
            if *v != NODATA_ELEVATION {
                sum += *v as f64;
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

/// Mapping from land-cover class code to class name.
///
/// The legend is closed: binding a grid containing a code without a legend
/// entry fails, since the downstream solver depends on a fixed class set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Legend {
    classes: BTreeMap<i32, String>,
}

impl Legend {
    /// Build a legend from `(code, name)` pairs.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i32, S)>,
        S: Into<String>,
    {
        Self {
            classes: entries.into_iter().map(|(c, n)| (c, n.into())).collect(),
        }
    }

    /// Name of a class code, if present.
    pub fn class_name(&self, code: i32) -> Option<&str> {
        self.classes.get(&code).map(String::as_str)
    }

    /// Whether the legend contains a code.
    pub fn contains(&self, code: i32) -> bool {
        self.classes.contains_key(&code)
    }

    /// Iterate over `(code, name)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &str)> {
        self.classes.iter().map(|(c, n)| (*c, n.as_str()))
    }

    /// Number of classes in the legend.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the legend has no classes.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Categorical land-cover raster over a coordinate frame.
#[derive(Debug, Clone)]
pub struct LandCoverGrid {
    frame: CoordinateFrame,
    data: Vec<i32>,
    legend: Legend,
}

impl LandCoverGrid {
    /// Bind class codes to a frame with their legend.
    ///
    /// Fails on a dimension mismatch, or when a non-nodata code in the data
    /// has no legend entry.
    pub fn new(frame: CoordinateFrame, data: Vec<i32>, legend: Legend) -> Result<Self> {
        if data.len() != frame.cell_count() {
            return Err(GridError::DimensionMismatch {
                expected: frame.cell_count(),
                actual: data.len(),
            });
        }
        for &code in &data {
            if code != NODATA_CLASS && !legend.contains(code) {
                return Err(GridError::CodeNotInLegend(code));
            }
        }
        Ok(Self {
            frame,
            data,
            legend,
        })
    }

    /// The frame this grid is aligned to.
    pub fn frame(&self) -> &CoordinateFrame {
        &self.frame
    }

    /// Raw codes, row-major from the north edge.
    pub fn values(&self) -> &[i32] {
        &self.data
    }

    /// The legend mapping codes to class names.
    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    /// Code at `(col, row)`, `None` for the nodata sentinel.
    pub fn get(&self, col: usize, row: usize) -> Option<i32> {
        let v = self.data[self.frame.index(col, row)];
        if v == NODATA_CLASS {
            None
        } else {
            Some(v)
        }
    }

    /// Distinct non-nodata codes present in the grid, in ascending order.
    pub fn present_codes(&self) -> Vec<i32> {
        let mut codes: Vec<i32> = self
            .data
            .iter()
            .copied()
            .filter(|c| *c != NODATA_CLASS)
            .collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }
}
