//! Elevation provider: tiles in, frame-aligned elevation grid out.

use crate::decode::SourceTile;
use crate::source::TileSource;
use crate::tile_coord::{TileCoord, DEFAULT_ZOOM};
use crate::{DemError, Result};
use a3dprep_cache::{CacheError, FetchCache};
use a3dprep_grid::transforms;
use a3dprep_grid::{CoordinateFrame, ElevationGrid, LatLonBounds, NODATA_ELEVATION};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Configuration for the elevation provider.
#[derive(Debug, Clone)]
pub struct DemConfig {
    /// Zoom level of the tile pyramid to sample from.
    pub zoom: u8,
    /// Minimum fraction of frame cells that must receive valid data before
    /// the result is considered complete; below this a partial-coverage
    /// warning is recorded.
    pub min_coverage: f64,
}

impl Default for DemConfig {
    fn default() -> Self {
        DemConfig {
            zoom: DEFAULT_ZOOM,
            min_coverage: 0.98,
        }
    }
}

/// Non-fatal condition recorded while producing the elevation grid.
#[derive(Debug, Clone, PartialEq)]
pub enum DemWarning {
    /// Less than the configured fraction of the frame has valid data.
    PartialCoverage {
        /// Fraction of cells with valid elevation.
        coverage: f64,
        /// Configured minimum.
        minimum: f64,
    },
}

impl std::fmt::Display for DemWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DemWarning::PartialCoverage { coverage, minimum } => write!(
                f,
                "elevation covers only {:.1}% of the frame (minimum {:.1}%)",
                coverage * 100.0,
                minimum * 100.0
            ),
        }
    }
}

/// Result of an elevation fetch: the grid plus coverage accounting.
#[derive(Debug)]
pub struct DemOutcome {
    /// Frame-aligned elevation grid.
    pub grid: ElevationGrid,
    /// Fraction of cells holding valid elevation.
    pub coverage: f64,
    /// Non-fatal warnings to surface in the package metadata.
    pub warnings: Vec<DemWarning>,
}

/// Fetches, caches and resamples elevation tiles onto a coordinate frame.
pub struct DemProvider<'a> {
    source: &'a dyn TileSource,
    cache: &'a FetchCache,
    config: DemConfig,
}

impl<'a> DemProvider<'a> {
    /// Create a provider over a tile source and a shared cache.
    pub fn new(source: &'a dyn TileSource, cache: &'a FetchCache, config: DemConfig) -> Self {
        Self {
            source,
            cache,
            config,
        }
    }

    /// Produce the elevation grid for a frame.
    ///
    /// Guarantees: the output grid matches `frame` exactly in dimensions and
    /// CRS; cells over missing source tiles or source nodata carry the
    /// nodata sentinel; the same bilinear rule is applied on every run so
    /// repeated fetches are reproducible.
    pub fn fetch_elevation(&self, frame: &CoordinateFrame) -> Result<DemOutcome> {
        let bbox = frame_bbox_wgs84(frame)?;
        let tiles = TileCoord::covering(&bbox, self.config.zoom)?;
        info!(
            tiles = tiles.len(),
            zoom = self.config.zoom,
            %frame,
            "fetching elevation tiles"
        );

        let mut decoded: HashMap<TileCoord, Option<SourceTile>> = HashMap::new();
        for coord in &tiles {
            let origin = self.source.origin(*coord);
            let bytes = self
                .cache
                .get_or_fetch(&coord.cache_key(), Some(&origin), || {
                    // A definitive gap is cached as a zero-byte entry so the
                    // miss is remembered like any other tile.
                    match self.source.fetch_tile(*coord) {
                        Ok(Some(bytes)) => Ok(bytes),
                        Ok(None) => Ok(Vec::new()),
                        Err(err) => Err(err.to_string()),
                    }
                })
                .map_err(map_cache_error)?;

            let tile = if bytes.is_empty() {
                debug!(%coord, "no source data for tile");
                None
            } else {
                Some(SourceTile::decode(&bytes, coord.bounds())?)
            };
            decoded.insert(*coord, tile);
        }

        let mut data = vec![NODATA_ELEVATION; frame.cell_count()];
        let mut valid = 0usize;
        for row in 0..frame.nrows {
            for col in 0..frame.ncols {
                let (x, y) = frame.cell_center(col, row);
                let (lon, lat) = transforms::to_wgs84(x, y, frame.epsg)?;
                let coord = TileCoord::from_lon_lat(lon, lat, self.config.zoom)?;
                if let Some(Some(tile)) = decoded.get(&coord) {
                    if let Some(value) = tile.sample_bilinear(lon, lat) {
                        data[frame.index(col, row)] = value;
                        valid += 1;
                    }
                }
            }
        }

        if valid == 0 {
            return Err(DemError::NoCoverage);
        }

        let coverage = valid as f64 / frame.cell_count() as f64;
        let mut warnings = Vec::new();
        if coverage < self.config.min_coverage {
            warn!(
                coverage = %format!("{:.3}", coverage),
                minimum = self.config.min_coverage,
                "elevation only partially covers the frame"
            );
            warnings.push(DemWarning::PartialCoverage {
                coverage,
                minimum: self.config.min_coverage,
            });
        }

        Ok(DemOutcome {
            grid: ElevationGrid::new(*frame, data)?,
            coverage,
            warnings,
        })
    }
}

/// WGS84 bounding box of a frame's extent.
fn frame_bbox_wgs84(frame: &CoordinateFrame) -> Result<LatLonBounds> {
    let (min_x, min_y, max_x, max_y) = frame.extent();
    let (lon, lat) = transforms::to_wgs84(min_x, min_y, frame.epsg)?;
    let mut bounds = LatLonBounds {
        min_lon: lon,
        min_lat: lat,
        max_lon: lon,
        max_lat: lat,
    };
    for (x, y) in [(min_x, max_y), (max_x, min_y), (max_x, max_y)] {
        let (lon, lat) = transforms::to_wgs84(x, y, frame.epsg)?;
        bounds = bounds.union(&LatLonBounds {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        });
    }
    Ok(bounds)
}

/// Fetch failures through the cache are source failures; everything else is
/// cache infrastructure trouble.
fn map_cache_error(err: CacheError) -> DemError {
    match err {
        CacheError::FetchFailed { key, reason } => DemError::SourceUnavailable {
            what: format!("tile {key}"),
            reason,
        },
        other => DemError::Cache(other),
    }
}
