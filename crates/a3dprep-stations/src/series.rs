//! Time-series handling: raw measurements in, solver-ready SMET files out.
//!
//! Raw series arrive with whatever units and gaps the station network
//! publishes. Materialization projects them onto the exact requested date
//! range at the station's sampling step, normalizes units to the canonical
//! set the solver consumes (air temperature in Kelvin, relative humidity as
//! a fraction, wind in m/s, heights in metres), and keeps every missing
//! timestamp as an explicit nodata row. Nothing is interpolated and nothing
//! is dropped.

use crate::{Result, StationError, StationMeta};
use a3dprep_grid::transforms;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// Nodata value used in SMET output.
pub const SMET_NODATA: f64 = -999.0;

/// Inclusive date range of a simulation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First timestamp of the range.
    pub start: DateTime<Utc>,
    /// Last timestamp of the range (inclusive).
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Create a range, failing when `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(StationError::InvalidRange(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Timestamps of the range at a sampling step, both endpoints included.
    pub fn timestamps(&self, step_minutes: u32) -> Vec<DateTime<Utc>> {
        let step = Duration::minutes(i64::from(step_minutes.max(1)));
        let mut out = Vec::new();
        let mut ts = self.start;
        while ts <= self.end {
            out.push(ts);
            ts += step;
        }
        out
    }
}

/// Unit a raw measurement field is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Air temperature in Kelvin (canonical).
    Kelvin,
    /// Air temperature in degrees Celsius.
    Celsius,
    /// Ratio in `[0, 1]` (canonical for humidity).
    Fraction,
    /// Percentage in `[0, 100]`.
    Percent,
    /// Speed in m/s (canonical).
    MetersPerSecond,
    /// Speed in km/h.
    KilometersPerHour,
    /// Length in metres (canonical for heights).
    Meters,
    /// Length in centimetres.
    Centimeters,
    /// Precipitation sum in millimetres (canonical).
    Millimeters,
    /// Radiation flux in W/m² (canonical).
    WattsPerSquareMeter,
    /// Direction in degrees.
    Degrees,
}

impl Unit {
    /// Convert a value in this unit to the canonical unit of its quantity.
    pub fn normalize(&self, value: f64) -> f64 {
        match self {
            Unit::Celsius => value + 273.15,
            Unit::Percent => value / 100.0,
            Unit::KilometersPerHour => value / 3.6,
            Unit::Centimeters => value / 100.0,
            Unit::Kelvin
            | Unit::Fraction
            | Unit::MetersPerSecond
            | Unit::Meters
            | Unit::Millimeters
            | Unit::WattsPerSquareMeter
            | Unit::Degrees => value,
        }
    }
}

/// One field of a raw series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawField {
    /// Canonical field name (`TA`, `RH`, `VW`, `HS`, `PSUM`, ...).
    pub name: String,
    /// Unit the values are published in.
    pub unit: Unit,
}

/// One timestamped row of raw values, aligned with the field list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Measurement timestamp.
    pub timestamp: DateTime<Utc>,
    /// One value per field; `None` where the station reported nothing.
    pub values: Vec<Option<f64>>,
}

/// Raw measurement series as delivered by a station data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSeries {
    /// Field descriptions.
    pub fields: Vec<RawField>,
    /// Timestamped rows, not necessarily gap-free or ordered.
    pub records: Vec<RawRecord>,
}

impl RawSeries {
    /// Fraction of the expected timestamps for `range` at `step_minutes`
    /// that have at least one reported value.
    pub fn completeness(&self, range: &DateRange, step_minutes: u32) -> f64 {
        let expected = range.timestamps(step_minutes);
        if expected.is_empty() {
            return 0.0;
        }
        let present: BTreeMap<DateTime<Utc>, &RawRecord> = self
            .records
            .iter()
            .map(|r| (r.timestamp, r))
            .collect();
        let mut hits = 0usize;
        for ts in &expected {
            if let Some(record) = present.get(ts) {
                if record.values.iter().any(Option::is_some) {
                    hits += 1;
                }
            }
        }
        hits as f64 / expected.len() as f64
    }
}

/// Unit-normalized series on the exact requested timestamp grid.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    /// Field names, canonical units implied.
    pub fields: Vec<String>,
    /// Sampling step in minutes.
    pub step_minutes: u32,
    /// One row per expected timestamp; missing measurements stay `None`.
    pub records: Vec<(DateTime<Utc>, Vec<Option<f64>>)>,
}

/// Project a raw series onto the requested range.
///
/// Every timestamp of the range appears exactly once in the output. A
/// timestamp the station did not report becomes a row of `None`s; it is
/// never interpolated from neighbours and never silently dropped.
pub fn materialize(raw: &RawSeries, range: &DateRange, step_minutes: u32) -> TimeSeries {
    let by_time: BTreeMap<DateTime<Utc>, &RawRecord> =
        raw.records.iter().map(|r| (r.timestamp, r)).collect();

    let mut records = Vec::new();
    for ts in range.timestamps(step_minutes) {
        let values = match by_time.get(&ts) {
            Some(record) => raw
                .fields
                .iter()
                .zip(record.values.iter())
                .map(|(field, value)| value.map(|v| field.unit.normalize(v)))
                .collect(),
            None => vec![None; raw.fields.len()],
        };
        records.push((ts, values));
    }

    TimeSeries {
        fields: raw.fields.iter().map(|f| f.name.clone()).collect(),
        step_minutes,
        records,
    }
}

/// Write a series as a SMET 1.1 ASCII file.
pub fn write_smet<W: Write>(w: &mut W, station: &StationMeta, series: &TimeSeries) -> Result<()> {
    let (lon, lat) = transforms::to_wgs84(station.easting, station.northing, station.epsg)?;

    writeln!(w, "SMET 1.1 ASCII")?;
    writeln!(w, "[HEADER]")?;
    writeln!(w, "station_id = {}", station.id)?;
    writeln!(w, "station_name = {}", station.name)?;
    writeln!(w, "latitude = {:.6}", lat)?;
    writeln!(w, "longitude = {:.6}", lon)?;
    writeln!(w, "altitude = {:.1}", station.elevation_m)?;
    writeln!(w, "nodata = {}", SMET_NODATA as i64)?;
    writeln!(w, "tz = 0")?;
    writeln!(w, "fields = timestamp {}", series.fields.join(" "))?;
    writeln!(w, "[DATA]")?;
    for (ts, values) in &series.records {
        let mut line = ts.format("%Y-%m-%dT%H:%M:%S").to_string();
        for value in values {
            line.push(' ');
            match value {
                Some(v) => line.push_str(&format!("{:.3}", v)),
                None => line.push_str(&format!("{}", SMET_NODATA as i64)),
            }
        }
        writeln!(w, "{}", line)?;
    }
    Ok(())
}
