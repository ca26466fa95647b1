//! # a3dprep-stations
//!
//! Meteorological station selection for the input-assembly pipeline.
//!
//! A [`StationCatalog`] lists candidate stations around the region of
//! interest; each candidate is scored by horizontal distance to the region
//! centroid, elevation difference to the mean region elevation, and
//! completeness of its record over the requested range. The top-ranked
//! stations are materialized into unit-normalized, gap-explicit time series
//! and written as SMET files for the solver.
//!
//! Selection is deterministic: equal scores break toward the smaller
//! station id, so identical catalog contents and request parameters always
//! reproduce the same forcing set.

mod catalog;
mod error;
mod scoring;
mod selector;
mod series;

pub use catalog::{
    HttpStationCatalog, HttpStationDataSource, StationCatalog, StationDataSource, StationMeta,
};
pub use error::StationError;
pub use scoring::{ScoringWeights, ELEVATION_BAND_M};
pub use selector::{SelectedStation, SelectorConfig, StationSelector};
pub use series::{
    materialize, write_smet, DateRange, RawField, RawRecord, RawSeries, TimeSeries, Unit,
    SMET_NODATA,
};

/// Result type for station operations.
pub type Result<T> = std::result::Result<T, StationError>;
