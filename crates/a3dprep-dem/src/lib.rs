//! # a3dprep-dem
//!
//! Elevation provider for the input-assembly pipeline.
//!
//! Source elevation comes from a slippy-map pyramid of GeoTIFF tiles fetched
//! over HTTP (or any other [`TileSource`] implementation). Tiles are cached
//! through the shared [`FetchCache`](a3dprep_cache::FetchCache) keyed by
//! `dem/{z}/{x}/{y}`, decoded, and resampled with bilinear interpolation
//! onto the request's [`CoordinateFrame`](a3dprep_grid::CoordinateFrame).
//!
//! Cells over missing tiles or source nodata receive the nodata sentinel;
//! when the valid fraction falls below the configured minimum the outcome
//! carries a non-fatal partial-coverage warning that the orchestrator
//! records in the package metadata.
//!
//! ## Example
//!
//! ```no_run
//! use a3dprep_cache::{FetchCache, RetryPolicy};
//! use a3dprep_dem::{DemConfig, DemProvider, HttpTileSource};
//! use a3dprep_grid::{CoordinateFrame, Roi};
//! use std::time::Duration;
//!
//! let cache = FetchCache::open("./cache")?;
//! let source = HttpTileSource::new(
//!     "https://s3.amazonaws.com/elevation-tiles-prod/geotiff",
//!     Duration::from_secs(60),
//!     RetryPolicy::default(),
//! )?;
//! let provider = DemProvider::new(&source, &cache, DemConfig::default());
//!
//! let roi = Roi::around(2_780_000.0, 1_190_000.0, 1000.0, 2056)?;
//! let frame = CoordinateFrame::from_roi(&roi, 25.0)?;
//! let outcome = provider.fetch_elevation(&frame)?;
//! println!("mean elevation: {:?}", outcome.grid.mean_elevation());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod decode;
mod error;
mod provider;
mod source;
mod tile_coord;

pub use decode::SourceTile;
pub use error::DemError;
pub use provider::{DemConfig, DemOutcome, DemProvider, DemWarning};
pub use source::{DownloadStats, HttpTileSource, TileSource};
pub use tile_coord::{TileCoord, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM};

/// Result type for elevation operations.
pub type Result<T> = std::result::Result<T, DemError>;
