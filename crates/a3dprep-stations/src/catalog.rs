//! Station metadata, the catalog and data-source interfaces, and their HTTP
//! implementations.

use crate::{DateRange, RawSeries, Result, StationError};
use a3dprep_cache::{content_key, FetchCache, RetryPolicy};
use a3dprep_grid::{transforms, Roi};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

fn default_sample_step() -> u32 {
    60
}

/// Metadata describing one meteorological station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationMeta {
    /// Stable station identifier (e.g. `WFJ2`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Easting in the station's CRS.
    pub easting: f64,
    /// Northing in the station's CRS.
    pub northing: f64,
    /// EPSG code of the station coordinates.
    pub epsg: u32,
    /// Station elevation in metres.
    pub elevation_m: f64,
    /// Variables the station measures, as canonical field names.
    pub variables: Vec<String>,
    /// First timestamp with data.
    pub coverage_start: DateTime<Utc>,
    /// Last timestamp with data.
    pub coverage_end: DateTime<Utc>,
    /// Sampling step of the station's series in minutes.
    #[serde(default = "default_sample_step")]
    pub sample_step_minutes: u32,
}

impl StationMeta {
    /// Station position expressed in the given CRS.
    pub fn position_in(&self, epsg: u32) -> Result<(f64, f64)> {
        if self.epsg == epsg {
            return Ok((self.easting, self.northing));
        }
        let (lon, lat) = transforms::to_wgs84(self.easting, self.northing, self.epsg)?;
        Ok(transforms::from_wgs84(lon, lat, epsg)?)
    }

    /// Whether the station's record overlaps a requested range at all.
    pub fn covers_any_of(&self, range: &DateRange) -> bool {
        self.coverage_start <= range.end && self.coverage_end >= range.start
    }
}

/// Catalog of stations queryable by region.
pub trait StationCatalog: Send + Sync {
    /// All stations within `radius_m` of the region's centroid.
    ///
    /// The radius is deliberately larger than the region itself, since the
    /// meteorological representativeness of a station extends well beyond
    /// the simulated footprint.
    fn query(&self, roi: &Roi, radius_m: f64) -> Result<Vec<StationMeta>>;
}

/// Source of raw measurement series for a station.
pub trait StationDataSource: Send + Sync {
    /// Fetch the raw series of a station over a date range.
    fn fetch_series(&self, station: &StationMeta, range: &DateRange) -> Result<RawSeries>;
}

/// HTTP catalog answering `GET {base}/stations?bbox=...&radius=...` with a
/// JSON array of [`StationMeta`].
///
/// Responses are cached through the shared fetch cache keyed by a digest of
/// the query, so a rerun of the same request does not hit the network.
pub struct HttpStationCatalog<'a> {
    base_url: String,
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
    cache: &'a FetchCache,
}

impl<'a> std::fmt::Debug for HttpStationCatalog<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStationCatalog")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl<'a> HttpStationCatalog<'a> {
    /// Create a catalog client with the given timeout and retry policy.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        retry: RetryPolicy,
        cache: &'a FetchCache,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StationError::SourceUnavailable {
                what: "building HTTP client".to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry,
            cache,
        })
    }
}

impl<'a> StationCatalog for HttpStationCatalog<'a> {
    fn query(&self, roi: &Roi, radius_m: f64) -> Result<Vec<StationMeta>> {
        let bbox = roi.bbox_wgs84()?;
        let url = format!(
            "{}/stations?bbox={}&radius={:.0}",
            self.base_url,
            bbox.to_query_string(),
            radius_m
        );
        let key = format!("stations/catalog/{}", &content_key(url.as_bytes())[..16]);

        let bytes = self
            .cache
            .get_or_fetch(&key, Some(&url), || {
                let fetched = self.retry.run("query station catalog", |_attempt| {
                    let response = self.client.get(&url).send().map_err(|e| e.to_string())?;
                    if !response.status().is_success() {
                        return Err(format!("HTTP {}", response.status()));
                    }
                    response
                        .bytes()
                        .map(|b| b.to_vec())
                        .map_err(|e| e.to_string())
                });
                fetched.map_err(|e| e.to_string())
            })
            .map_err(|err| match err {
                a3dprep_cache::CacheError::FetchFailed { key: _, reason } => {
                    StationError::SourceUnavailable {
                        what: "query station catalog".to_string(),
                        reason,
                    }
                }
                other => StationError::Cache(other),
            })?;

        let stations: Vec<StationMeta> = serde_json::from_slice(&bytes)?;
        debug!(count = stations.len(), "catalog query returned stations");
        Ok(stations)
    }
}

/// HTTP data source answering
/// `GET {base}/stations/{id}/timeseries?start=...&end=...` with a JSON
/// [`RawSeries`]. Series are time-dependent and fetched fresh on every run.
pub struct HttpStationDataSource {
    base_url: String,
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
}

impl std::fmt::Debug for HttpStationDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStationDataSource")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpStationDataSource {
    /// Create a data-source client with the given timeout and retry policy.
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StationError::SourceUnavailable {
                what: "building HTTP client".to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry,
        })
    }
}

impl StationDataSource for HttpStationDataSource {
    fn fetch_series(&self, station: &StationMeta, range: &DateRange) -> Result<RawSeries> {
        let url = format!(
            "{}/stations/{}/timeseries?start={}&end={}",
            self.base_url,
            station.id,
            range.start.format("%Y-%m-%dT%H:%M:%S"),
            range.end.format("%Y-%m-%dT%H:%M:%S"),
        );
        let bytes = self
            .retry
            .run(&format!("fetch series for {}", station.id), |_attempt| {
                let response = self.client.get(&url).send().map_err(|e| e.to_string())?;
                if !response.status().is_success() {
                    return Err(format!("HTTP {}", response.status()));
                }
                response
                    .bytes()
                    .map(|b| b.to_vec())
                    .map_err(|e| e.to_string())
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(id: &str) -> StationMeta {
        StationMeta {
            id: id.to_string(),
            name: id.to_string(),
            easting: 2_780_000.0,
            northing: 1_190_000.0,
            epsg: 2056,
            elevation_m: 2000.0,
            variables: vec!["TA".to_string()],
            coverage_start: Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
            coverage_end: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            sample_step_minutes: 60,
        }
    }

    #[test]
    fn position_in_same_crs_is_identity() {
        let m = meta("A");
        assert_eq!(m.position_in(2056).unwrap(), (2_780_000.0, 1_190_000.0));
    }

    #[test]
    fn position_converts_between_swiss_frames() {
        let m = meta("A");
        let (e, n) = m.position_in(21781).unwrap();
        assert!((e - 780_000.0).abs() < 1e-6);
        assert!((n - 190_000.0).abs() < 1e-6);
    }

    #[test]
    fn coverage_overlap_check() {
        let m = meta("A");
        let inside = DateRange::new(
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 10, 23, 0, 0).unwrap(),
        )
        .unwrap();
        let after = DateRange::new(
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap(),
        )
        .unwrap();
        assert!(m.covers_any_of(&inside));
        assert!(!m.covers_any_of(&after));
    }

    #[test]
    fn station_meta_deserializes_with_default_step() {
        let json = r#"{
            "id": "WFJ2", "name": "Weissfluhjoch",
            "easting": 2780850.0, "northing": 1189230.0, "epsg": 2056,
            "elevation_m": 2536.0,
            "variables": ["TA", "RH", "VW", "HS"],
            "coverage_start": "1996-09-01T00:00:00Z",
            "coverage_end": "2024-06-30T23:00:00Z"
        }"#;
        let m: StationMeta = serde_json::from_str(json).unwrap();
        assert_eq!(m.sample_step_minutes, 60);
        assert_eq!(m.variables.len(), 4);
    }
}
