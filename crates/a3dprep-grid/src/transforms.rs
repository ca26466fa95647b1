//! Planar coordinate transforms between the supported reference systems.
//!
//! The pipeline works in projected Swiss frames (CH1903+ / LV95 and the
//! legacy CH1903 / LV03) and talks to tile and catalog services in WGS84.
//! The transforms here are the planar approximations that are accurate to a
//! few hundred metres inside Switzerland, which is sufficient for locating
//! source tiles and stations; the output grids themselves never leave the
//! projected frame.

use crate::{GridError, Result};

/// EPSG code for CH1903+ / LV95.
pub const EPSG_CH1903_PLUS: u32 = 2056;
/// EPSG code for the legacy CH1903 / LV03 frame.
pub const EPSG_CH1903: u32 = 21781;
/// EPSG code for WGS84 geographic coordinates.
pub const EPSG_WGS84: u32 = 4326;
/// EPSG code for CHTRS95 (accepted by name, not transformable here).
pub const EPSG_CHTRS95: u32 = 4932;

/// Metres per degree at Swiss latitudes, used by the planar approximation.
const METERS_PER_DEGREE: f64 = 111_000.0;

/// False easting/northing of the LV95 origin near Bern.
const LV95_EASTING: f64 = 2_600_000.0;
const LV95_NORTHING: f64 = 1_200_000.0;
/// Geographic coordinates of the LV95 origin.
const ORIGIN_LON: f64 = 7.5;
const ORIGIN_LAT: f64 = 46.5;
/// Offset between LV95 and LV03 coordinates.
const LV95_LV03_OFFSET_E: f64 = 2_000_000.0;
const LV95_LV03_OFFSET_N: f64 = 1_000_000.0;

/// Geographic bounding box in WGS84.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonBounds {
    /// West edge (degrees).
    pub min_lon: f64,
    /// South edge (degrees).
    pub min_lat: f64,
    /// East edge (degrees).
    pub max_lon: f64,
    /// North edge (degrees).
    pub max_lat: f64,
}

impl LatLonBounds {
    /// Check whether a coordinate lies within the bounds (edges inclusive).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &LatLonBounds) -> LatLonBounds {
        LatLonBounds {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    /// Format as `minx,miny,maxx,maxy` for bbox query parameters.
    pub fn to_query_string(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Map a coordinate-system name used in solver configuration to its EPSG code.
pub fn epsg_from_coord_sys(coord_sys: &str) -> Result<u32> {
    match coord_sys {
        "CH1903+" => Ok(EPSG_CH1903_PLUS),
        "CH1903" => Ok(EPSG_CH1903),
        "WGS84" => Ok(EPSG_WGS84),
        "CHTRS95" => Ok(EPSG_CHTRS95),
        other => Err(GridError::UnknownCoordSys(other.to_string())),
    }
}

/// Map an EPSG code back to the solver's coordinate-system name.
pub fn coord_sys_from_epsg(epsg: u32) -> Result<&'static str> {
    match epsg {
        EPSG_CH1903_PLUS => Ok("CH1903+"),
        EPSG_CH1903 => Ok("CH1903"),
        EPSG_WGS84 => Ok("WGS84"),
        EPSG_CHTRS95 => Ok("CHTRS95"),
        other => Err(GridError::UnsupportedCrs(other)),
    }
}

/// Transform a projected coordinate to WGS84 `(lon, lat)`.
pub fn to_wgs84(x: f64, y: f64, epsg: u32) -> Result<(f64, f64)> {
    match epsg {
        EPSG_WGS84 => Ok((x, y)),
        EPSG_CH1903_PLUS => Ok(lv95_to_wgs84(x, y)),
        EPSG_CH1903 => Ok(lv95_to_wgs84(x + LV95_LV03_OFFSET_E, y + LV95_LV03_OFFSET_N)),
        other => Err(GridError::UnsupportedCrs(other)),
    }
}

/// Transform a WGS84 `(lon, lat)` coordinate into the projected frame.
pub fn from_wgs84(lon: f64, lat: f64, epsg: u32) -> Result<(f64, f64)> {
    match epsg {
        EPSG_WGS84 => Ok((lon, lat)),
        EPSG_CH1903_PLUS => Ok(wgs84_to_lv95(lon, lat)),
        EPSG_CH1903 => {
            let (e, n) = wgs84_to_lv95(lon, lat);
            Ok((e - LV95_LV03_OFFSET_E, n - LV95_LV03_OFFSET_N))
        }
        other => Err(GridError::UnsupportedCrs(other)),
    }
}

fn lv95_to_wgs84(e: f64, n: f64) -> (f64, f64) {
    let lon = (e - LV95_EASTING) / METERS_PER_DEGREE + ORIGIN_LON;
    let lat = (n - LV95_NORTHING) / METERS_PER_DEGREE + ORIGIN_LAT;
    (lon, lat)
}

fn wgs84_to_lv95(lon: f64, lat: f64) -> (f64, f64) {
    let e = (lon - ORIGIN_LON) * METERS_PER_DEGREE + LV95_EASTING;
    let n = (lat - ORIGIN_LAT) * METERS_PER_DEGREE + LV95_NORTHING;
    (e, n)
}
