//! Station relevance scoring.
//!
//! Candidates are ranked by a weighted combination of horizontal distance
//! to the region centroid, elevation difference to the mean region
//! elevation, and completeness of their record over the requested range.
//! The weights are a policy choice and are therefore part of the request
//! configuration rather than constants; the defaults below weight distance
//! slightly above the other two terms.

use serde::{Deserialize, Serialize};

/// Elevation difference treated as "completely unrepresentative".
///
/// Differences are normalized against this band before weighting so the
/// elevation term is commensurate with the distance and completeness terms.
pub const ELEVATION_BAND_M: f64 = 1000.0;

/// Weights of the three scoring terms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight of the horizontal-distance term.
    pub distance: f64,
    /// Weight of the elevation-difference term.
    pub elevation: f64,
    /// Weight of the record-completeness term.
    pub completeness: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            distance: 0.4,
            elevation: 0.3,
            completeness: 0.3,
        }
    }
}

impl ScoringWeights {
    /// Combined relevance score in `[0, 1]`; higher is better.
    ///
    /// Distance is normalized against the search radius and elevation
    /// difference against [`ELEVATION_BAND_M`]; both saturate at their
    /// normalization bound so an extreme outlier in one term cannot push
    /// the score negative.
    pub fn score(
        &self,
        distance_m: f64,
        search_radius_m: f64,
        elevation_diff_m: f64,
        completeness: f64,
    ) -> f64 {
        let total = self.distance + self.elevation + self.completeness;
        if total <= 0.0 {
            return 0.0;
        }
        let distance_term = 1.0 - (distance_m / search_radius_m).clamp(0.0, 1.0);
        let elevation_term = 1.0 - (elevation_diff_m.abs() / ELEVATION_BAND_M).clamp(0.0, 1.0);
        let completeness_term = completeness.clamp(0.0, 1.0);

        (self.distance * distance_term
            + self.elevation * elevation_term
            + self.completeness * completeness_term)
            / total
    }
}
