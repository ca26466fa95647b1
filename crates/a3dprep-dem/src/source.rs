//! Tile sources: where raw elevation tile bytes come from.

use crate::{DemError, Result, TileCoord};
use a3dprep_cache::RetryPolicy;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Download statistics for a tile source.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadStats {
    /// Number of tiles downloaded this session.
    pub tiles_downloaded: usize,
    /// Total bytes downloaded this session.
    pub bytes_downloaded: u64,
}

/// A source of raw GeoTIFF tile bytes.
///
/// `Ok(None)` means the source definitively has no tile at that coordinate
/// (open water, outside coverage); that is a data gap, not an error, and the
/// provider fills the affected cells with the nodata sentinel.
pub trait TileSource: Send + Sync {
    /// Fetch the raw bytes for one tile.
    fn fetch_tile(&self, coord: TileCoord) -> Result<Option<Vec<u8>>>;

    /// Human-readable origin for a tile, recorded in cache metadata.
    fn origin(&self, coord: TileCoord) -> String;
}

/// HTTP tile source serving `{base_url}/{z}/{x}/{y}.tif`.
///
/// Transient failures (connection errors, timeouts, non-success statuses)
/// are retried under the configured [`RetryPolicy`]; HTTP 404 is treated as
/// a definitive gap. Every request carries the configured timeout so no
/// fetch can hang indefinitely.
pub struct HttpTileSource {
    base_url: String,
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
    tiles_downloaded: AtomicUsize,
    bytes_downloaded: AtomicU64,
}

impl std::fmt::Debug for HttpTileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTileSource")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpTileSource {
    /// Create a source with the given per-request timeout and retry policy.
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DemError::SourceUnavailable {
                what: "building HTTP client".to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry,
            tiles_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
        })
    }

    /// URL for one tile.
    pub fn tile_url(&self, coord: TileCoord) -> String {
        format!("{}/{}/{}/{}.tif", self.base_url, coord.z, coord.x, coord.y)
    }

    /// Download statistics for this session.
    pub fn stats(&self) -> DownloadStats {
        DownloadStats {
            tiles_downloaded: self.tiles_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }
}

impl TileSource for HttpTileSource {
    fn fetch_tile(&self, coord: TileCoord) -> Result<Option<Vec<u8>>> {
        let url = self.tile_url(coord);
        let fetched = self.retry.run(&format!("fetch tile {coord}"), |_attempt| {
            let response = self.client.get(&url).send().map_err(|e| e.to_string())?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !response.status().is_success() {
                return Err(format!("HTTP {}", response.status()));
            }
            let bytes = response.bytes().map_err(|e| e.to_string())?;
            Ok(Some(bytes.to_vec()))
        })?;

        if let Some(bytes) = &fetched {
            self.tiles_downloaded.fetch_add(1, Ordering::Relaxed);
            self.bytes_downloaded
                .fetch_add(bytes.len() as u64, Ordering::Relaxed);
            debug!(%coord, bytes = bytes.len(), "downloaded tile");
        } else {
            debug!(%coord, "tile not present at source");
        }
        Ok(fetched)
    }

    fn origin(&self, coord: TileCoord) -> String {
        self.tile_url(coord)
    }
}
