//! Station selection: catalog query, scoring, and series materialization.

use crate::scoring::ScoringWeights;
use crate::series::{materialize, TimeSeries};
use crate::{DateRange, Result, StationCatalog, StationDataSource, StationError, StationMeta};
use a3dprep_grid::Roi;
use tracing::{debug, info};

/// Configuration of the selection policy.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Catalog search radius around the region centroid, in metres.
    ///
    /// Deliberately much larger than the region itself (default 50 km, the
    /// scale over which alpine weather stations stay representative).
    pub search_radius_m: f64,
    /// Minimum record completeness a candidate must reach.
    pub min_completeness: f64,
    /// Scoring weights.
    pub weights: ScoringWeights,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        SelectorConfig {
            search_radius_m: 50_000.0,
            min_completeness: 0.8,
            weights: ScoringWeights::default(),
        }
    }
}

/// A station that survived selection, with its score breakdown and series.
#[derive(Debug, Clone)]
pub struct SelectedStation {
    /// Station metadata.
    pub meta: StationMeta,
    /// Horizontal distance to the region centroid in metres.
    pub distance_m: f64,
    /// Elevation difference to the mean region elevation in metres.
    pub elevation_diff_m: f64,
    /// Record completeness over the requested range.
    pub completeness: f64,
    /// Combined relevance score.
    pub score: f64,
    /// Materialized series over the exact requested range.
    pub series: TimeSeries,
}

/// Scores and selects forcing stations for a region and period.
pub struct StationSelector<'a> {
    catalog: &'a dyn StationCatalog,
    data: &'a dyn StationDataSource,
    config: SelectorConfig,
}

impl<'a> StationSelector<'a> {
    /// Create a selector over a catalog and data source.
    pub fn new(
        catalog: &'a dyn StationCatalog,
        data: &'a dyn StationDataSource,
        config: SelectorConfig,
    ) -> Self {
        Self {
            catalog,
            data,
            config,
        }
    }

    /// Query the catalog for candidates around the region.
    ///
    /// This is the only part of selection with no dependency on the
    /// elevation grid, so the orchestrator may run it concurrently with the
    /// raster fetches and score the candidates afterwards.
    pub fn query_candidates(&self, roi: &Roi) -> Result<Vec<StationMeta>> {
        let candidates = self.catalog.query(roi, self.config.search_radius_m)?;
        info!(
            candidates = candidates.len(),
            radius_m = self.config.search_radius_m,
            "station catalog query complete"
        );
        Ok(candidates)
    }

    /// Select up to `max_count` stations for the region and range.
    ///
    /// `mean_roi_elevation` comes from the already-fetched elevation grid,
    /// which is why station scoring runs after the elevation stage.
    ///
    /// Selection is deterministic: candidates are ranked by descending
    /// score with ties broken by station id, so identical catalog contents
    /// and request parameters reproduce the same set in the same order.
    pub fn select_stations(
        &self,
        roi: &Roi,
        range: &DateRange,
        mean_roi_elevation: f64,
        max_count: usize,
    ) -> Result<Vec<SelectedStation>> {
        let candidates = self.query_candidates(roi)?;
        self.select_from_candidates(candidates, roi, range, mean_roi_elevation, max_count)
    }

    /// Score, filter and rank an already-queried candidate list.
    pub fn select_from_candidates(
        &self,
        candidates: Vec<StationMeta>,
        roi: &Roi,
        range: &DateRange,
        mean_roi_elevation: f64,
        max_count: usize,
    ) -> Result<Vec<SelectedStation>> {
        let (center_x, center_y) = roi.center();
        let considered = candidates.len();
        let mut scored: Vec<SelectedStation> = Vec::new();

        for meta in candidates {
            if !meta.covers_any_of(range) {
                debug!(id = %meta.id, "station record does not overlap the request");
                continue;
            }
            let (e, n) = meta.position_in(roi.epsg)?;
            let distance_m = ((e - center_x).powi(2) + (n - center_y).powi(2)).sqrt();
            if distance_m > self.config.search_radius_m {
                debug!(id = %meta.id, distance_m, "station outside the search radius");
                continue;
            }

            let raw = self.data.fetch_series(&meta, range)?;
            let completeness = raw.completeness(range, meta.sample_step_minutes);
            if completeness < self.config.min_completeness {
                debug!(
                    id = %meta.id,
                    completeness = %format!("{:.2}", completeness),
                    "station record too incomplete"
                );
                continue;
            }

            let elevation_diff_m = meta.elevation_m - mean_roi_elevation;
            let score = self.config.weights.score(
                distance_m,
                self.config.search_radius_m,
                elevation_diff_m,
                completeness,
            );
            let series = materialize(&raw, range, meta.sample_step_minutes);
            scored.push(SelectedStation {
                meta,
                distance_m,
                elevation_diff_m,
                completeness,
                score,
                series,
            });
        }

        if scored.is_empty() {
            return Err(StationError::NoStationsAvailable {
                considered,
                threshold: self.config.min_completeness,
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.meta.id.cmp(&b.meta.id))
        });
        scored.truncate(max_count);

        info!(
            selected = scored.len(),
            best = %scored[0].meta.id,
            "station selection complete"
        );
        Ok(scored)
    }
}
