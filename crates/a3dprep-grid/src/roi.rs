//! Region of interest handling.
//!
//! A [`Roi`] is the user-selected simulation footprint in a projected
//! coordinate frame. It can be given as explicit bounds or constructed as a
//! square box around a point, and it is buffered outward when searching for
//! meteorological stations whose representativeness extends beyond the
//! simulated area.

use crate::transforms::{self, LatLonBounds};
use crate::Result;
use crate::GridError;

/// Region of interest as an axis-aligned bounding box in a projected CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    /// West edge (easting).
    pub min_x: f64,
    /// South edge (northing).
    pub min_y: f64,
    /// East edge (easting).
    pub max_x: f64,
    /// North edge (northing).
    pub max_y: f64,
    /// EPSG code of the projected frame the bounds are expressed in.
    pub epsg: u32,
}

impl Roi {
    /// Create a region from explicit bounds.
    ///
    /// Fails when the extent is degenerate (zero or negative on either axis).
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, epsg: u32) -> Result<Self> {
        if !(min_x < max_x) || !(min_y < max_y) {
            return Err(GridError::InvalidRegion(format!(
                "bounds [{min_x}, {min_y}, {max_x}, {max_y}] have zero or negative extent"
            )));
        }
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return Err(GridError::InvalidRegion(
                "bounds contain non-finite coordinates".to_string(),
            ));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
            epsg,
        })
    }

    /// Create a square region of `size_m` metres centred on a point.
    pub fn around(center_x: f64, center_y: f64, size_m: f64, epsg: u32) -> Result<Self> {
        if !(size_m > 0.0) {
            return Err(GridError::InvalidRegion(format!(
                "region size must be positive, got {size_m}"
            )));
        }
        let half = size_m / 2.0;
        Self::new(
            center_x - half,
            center_y - half,
            center_x + half,
            center_y + half,
            epsg,
        )
    }

    /// Width of the region in CRS units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the region in CRS units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Centroid of the region.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Check whether a point lies inside the region (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Region grown outward by `distance` CRS units on every side.
    pub fn buffered(&self, distance: f64) -> Roi {
        Roi {
            min_x: self.min_x - distance,
            min_y: self.min_y - distance,
            max_x: self.max_x + distance,
            max_y: self.max_y + distance,
            epsg: self.epsg,
        }
    }

    /// Bounding box of the region in WGS84, for tile and catalog queries.
    pub fn bbox_wgs84(&self) -> Result<LatLonBounds> {
        let (lon, lat) = transforms::to_wgs84(self.min_x, self.min_y, self.epsg)?;
        let mut bounds = LatLonBounds {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        };
        for (x, y) in [
            (self.min_x, self.max_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
        ] {
            let (lon, lat) = transforms::to_wgs84(x, y, self.epsg)?;
            bounds = bounds.union(&LatLonBounds {
                min_lon: lon,
                min_lat: lat,
                max_lon: lon,
                max_lat: lat,
            });
        }
        Ok(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn around_builds_square_box() {
        let roi = Roi::around(2_780_000.0, 1_190_000.0, 1000.0, 2056).unwrap();
        assert_relative_eq!(roi.width(), 1000.0);
        assert_relative_eq!(roi.height(), 1000.0);
        assert_eq!(roi.center(), (2_780_000.0, 1_190_000.0));
    }

    #[test]
    fn degenerate_bounds_are_rejected() {
        assert!(Roi::new(10.0, 0.0, 10.0, 5.0, 2056).is_err());
        assert!(Roi::new(10.0, 7.0, 20.0, 5.0, 2056).is_err());
        assert!(Roi::around(0.0, 0.0, 0.0, 2056).is_err());
        assert!(Roi::around(0.0, 0.0, -100.0, 2056).is_err());
    }

    #[test]
    fn buffered_grows_every_side() {
        let roi = Roi::new(100.0, 200.0, 300.0, 400.0, 2056).unwrap();
        let buffered = roi.buffered(50.0);
        assert_eq!(buffered.min_x, 50.0);
        assert_eq!(buffered.min_y, 150.0);
        assert_eq!(buffered.max_x, 350.0);
        assert_eq!(buffered.max_y, 450.0);
        assert_eq!(buffered.epsg, roi.epsg);
    }

    #[test]
    fn contains_is_edge_inclusive() {
        let roi = Roi::new(0.0, 0.0, 10.0, 10.0, 2056).unwrap();
        assert!(roi.contains(0.0, 0.0));
        assert!(roi.contains(10.0, 10.0));
        assert!(roi.contains(5.0, 5.0));
        assert!(!roi.contains(-0.1, 5.0));
        assert!(!roi.contains(5.0, 10.1));
    }

    #[test]
    fn bbox_wgs84_orders_edges() {
        let roi = Roi::around(2_780_000.0, 1_190_000.0, 5000.0, 2056).unwrap();
        let bbox = roi.bbox_wgs84().unwrap();
        assert!(bbox.min_lon < bbox.max_lon);
        assert!(bbox.min_lat < bbox.max_lat);
        // The LV95 test point sits in the Grisons, roughly 9.1E 46.4N.
        assert!(bbox.contains(9.12, 46.41));
    }
}
