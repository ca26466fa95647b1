//! Slippy-map tile addressing for the terrain-tile pyramid.
//!
//! Terrain tiles are addressed with the OpenStreetMap convention: `z` is the
//! zoom level, `x` the column from 180°W eastward, `y` the row from ~85°N
//! southward. At zoom 12 a tile spans roughly 0.088°, about 38 m per pixel
//! for a 256-pixel tile at the equator.

use crate::{DemError, Result};
use a3dprep_grid::LatLonBounds;
use std::f64::consts::PI;

/// Minimum valid zoom level.
pub const MIN_ZOOM: u8 = 1;

/// Maximum zoom level served by the terrain-tile pyramid.
pub const MAX_ZOOM: u8 = 14;

/// Default zoom level: a good balance of detail and tile count.
pub const DEFAULT_ZOOM: u8 = 12;

/// Tile coordinates `(z, x, y)` in the slippy-map scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Zoom level.
    pub z: u8,
    /// Column, 0 at 180°W, increasing eastward.
    pub x: u32,
    /// Row, 0 at ~85.05°N, increasing southward.
    pub y: u32,
}

impl TileCoord {
    /// Tile containing a WGS84 coordinate at the given zoom.
    pub fn from_lon_lat(lon: f64, lat: f64, z: u8) -> Result<Self> {
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&z) {
            return Err(DemError::InvalidZoomLevel(z));
        }

        // Web Mercator is undefined beyond ±85.0511°.
        let lat = lat.clamp(-85.0511, 85.0511);
        let n = (1u32 << z) as f64;

        let x = ((lon + 180.0) / 360.0 * n).floor();
        let lat_rad = lat.to_radians();
        let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

        let max_coord = (1u32 << z) - 1;
        Ok(Self {
            z,
            x: (x.max(0.0) as u32).min(max_coord),
            y: (y.max(0.0) as u32).min(max_coord),
        })
    }

    /// Geographic bounds of this tile.
    pub fn bounds(&self) -> LatLonBounds {
        let n = (1u32 << self.z) as f64;

        let min_lon = self.x as f64 / n * 360.0 - 180.0;
        let max_lon = (self.x + 1) as f64 / n * 360.0 - 180.0;

        // Inverse of the slippy-map row formula.
        let max_lat = (PI * (1.0 - 2.0 * self.y as f64 / n)).sinh().atan().to_degrees();
        let min_lat = (PI * (1.0 - 2.0 * (self.y + 1) as f64 / n)).sinh().atan().to_degrees();

        LatLonBounds {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Cache key for this tile, stable across runs.
    pub fn cache_key(&self) -> String {
        format!("dem/{}/{}/{}", self.z, self.x, self.y)
    }

    /// All tiles at zoom `z` intersecting a geographic bounding box,
    /// ordered west-to-east then north-to-south.
    pub fn covering(bounds: &LatLonBounds, z: u8) -> Result<Vec<TileCoord>> {
        let nw = TileCoord::from_lon_lat(bounds.min_lon, bounds.max_lat, z)?;
        let se = TileCoord::from_lon_lat(bounds.max_lon, bounds.min_lat, z)?;

        let mut tiles = Vec::with_capacity(
            ((se.x - nw.x + 1) * (se.y - nw.y + 1)) as usize,
        );
        for y in nw.y..=se.y {
            for x in nw.x..=se.x {
                tiles.push(TileCoord { z, x, y });
            }
        }
        Ok(tiles)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
