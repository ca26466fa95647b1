//! Assembly request: everything the UI layer hands to the pipeline.

use crate::error::ValidationError;
use a3dprep_grid::{transforms, Roi};
use a3dprep_stations::{DateRange, ScoringWeights};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_coord_sys() -> String {
    "CH1903+".to_string()
}

fn default_cell_size() -> f64 {
    25.0
}

fn default_max_stations() -> usize {
    5
}

fn default_search_radius() -> f64 {
    50_000.0
}

fn default_min_completeness() -> f64 {
    0.8
}

fn default_min_coverage() -> f64 {
    0.98
}

fn default_dem_zoom() -> u8 {
    a3dprep_dem::DEFAULT_ZOOM
}

/// Region of interest, either explicit bounds or a box around a point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoiSpec {
    /// Explicit `[min_x, min_y, max_x, max_y]` bounds.
    Bounds {
        /// Bounds in the request CRS.
        bounds: [f64; 4],
    },
    /// Square box of `size_m` metres centred on a point.
    Centered {
        /// Centre `[x, y]` in the request CRS.
        center: [f64; 2],
        /// Edge length in metres.
        size_m: f64,
    },
}

/// Point of interest designated for detailed solver output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiSpec {
    /// Easting in the request CRS.
    pub x: f64,
    /// Northing in the request CRS.
    pub y: f64,
    /// Altitude in metres, if known.
    #[serde(default)]
    pub z: Option<f64>,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Which land-cover source feeds the pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandCoverSelector {
    /// The configured remote classified dataset.
    #[default]
    Remote,
    /// A constant class over the whole region.
    Constant {
        /// PREVAH class code.
        code: i32,
    },
}

/// One assembly request: region, period, POI and policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyRequest {
    /// Simulation name; becomes the package directory name.
    pub name: String,
    /// Region of interest.
    pub roi: RoiSpec,
    /// Coordinate-system name of the request (`CH1903+`, `CH1903`, `WGS84`).
    #[serde(default = "default_coord_sys")]
    pub coord_sys: String,
    /// Target resolution in CRS units per cell.
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
    /// First timestamp of the simulated period.
    pub start: DateTime<Utc>,
    /// Last timestamp of the simulated period (inclusive).
    pub end: DateTime<Utc>,
    /// Point of interest, must lie inside the region.
    pub poi: PoiSpec,
    /// Land-cover source selection.
    #[serde(default)]
    pub land_cover: LandCoverSelector,
    /// Maximum number of forcing stations to select.
    #[serde(default = "default_max_stations")]
    pub max_stations: usize,
    /// Station scoring weights.
    #[serde(default)]
    pub scoring: ScoringWeights,
    /// Station search radius around the region centroid, metres.
    #[serde(default = "default_search_radius")]
    pub search_radius_m: f64,
    /// Minimum station record completeness.
    #[serde(default = "default_min_completeness")]
    pub min_completeness: f64,
    /// Minimum elevation coverage before a warning is recorded.
    #[serde(default = "default_min_coverage")]
    pub min_coverage: f64,
    /// Zoom level of the elevation tile pyramid.
    #[serde(default = "default_dem_zoom")]
    pub dem_zoom: u8,
    /// Initial-state snow files copied into the package unchanged.
    #[serde(default)]
    pub snowfiles: Vec<PathBuf>,
}

impl AssemblyRequest {
    /// Check that the simulation name can serve as a directory name.
    pub fn validate_name(&self) -> Result<(), ValidationError> {
        let ok = !self.name.is_empty()
            && !self
                .name
                .chars()
                .any(|c| c.is_whitespace() || c == '/' || c == '\\');
        if ok {
            Ok(())
        } else {
            Err(ValidationError::InvalidName(self.name.clone()))
        }
    }

    /// EPSG code of the request CRS.
    pub fn epsg(&self) -> a3dprep_grid::Result<u32> {
        transforms::epsg_from_coord_sys(&self.coord_sys)
    }

    /// Region of interest in the request CRS.
    pub fn roi(&self) -> a3dprep_grid::Result<Roi> {
        let epsg = self.epsg()?;
        match &self.roi {
            RoiSpec::Bounds { bounds } => {
                Roi::new(bounds[0], bounds[1], bounds[2], bounds[3], epsg)
            }
            RoiSpec::Centered { center, size_m } => {
                Roi::around(center[0], center[1], *size_m, epsg)
            }
        }
    }

    /// Requested date range.
    pub fn date_range(&self) -> a3dprep_stations::Result<DateRange> {
        DateRange::new(self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_request_parses_with_defaults() {
        let yaml = r#"
name: dischma
roi:
  center: [2780000.0, 1190000.0]
  size_m: 1000
start: 2023-01-01T00:00:00Z
end: 2023-01-10T23:00:00Z
poi:
  x: 2780100.0
  y: 1190200.0
"#;
        let request: AssemblyRequest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(request.coord_sys, "CH1903+");
        assert_eq!(request.cell_size, 25.0);
        assert_eq!(request.max_stations, 5);
        assert!(matches!(request.land_cover, LandCoverSelector::Remote));
        let roi = request.roi().unwrap();
        assert_eq!(roi.width(), 1000.0);
    }

    #[test]
    fn bounds_and_constant_land_cover_parse() {
        let yaml = r#"
name: testcase
roi:
  bounds: [2780000.0, 1190000.0, 2781000.0, 1191000.0]
cell_size: 50
start: 2023-02-01T00:00:00Z
end: 2023-02-05T23:00:00Z
poi:
  x: 2780500.0
  y: 1190500.0
  z: 2100.0
land_cover:
  constant:
    code: 15
"#;
        let request: AssemblyRequest = serde_yaml::from_str(yaml).unwrap();
        match request.land_cover {
            LandCoverSelector::Constant { code } => assert_eq!(code, 15),
            other => panic!("expected constant selector, got {other:?}"),
        }
        assert_eq!(request.roi().unwrap().height(), 1000.0);
    }

    #[test]
    fn names_with_whitespace_are_rejected() {
        let mut request: AssemblyRequest = serde_yaml::from_str(
            r#"
name: ok-name
roi: { center: [0.0, 0.0], size_m: 100 }
start: 2023-01-01T00:00:00Z
end: 2023-01-02T00:00:00Z
poi: { x: 0.0, y: 0.0 }
"#,
        )
        .unwrap();
        assert!(request.validate_name().is_ok());
        request.name = "two words".to_string();
        assert!(request.validate_name().is_err());
        request.name = "nested/path".to_string();
        assert!(request.validate_name().is_err());
        request.name = String::new();
        assert!(request.validate_name().is_err());
    }
}
