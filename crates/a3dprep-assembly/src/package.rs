//! Package writer: the directory layout and configuration the solver expects.
//!
//! ```text
//! <name>/
//!   input/
//!     surface-grids/   elevation (.dem) and land cover (.lus), frame-aligned
//!     meteo/           one SMET file per selected station, plus poi.smet
//!     snowfiles/       initial-state files, passed through if supplied
//!   output/            empty, reserved for the solver run
//!   io.ini             generated configuration
//!   metadata.json      frame parameters, station list, recorded warnings
//! ```
//!
//! Everything is written into a hidden staging directory first and renamed
//! into place at the end, so a failed or cancelled run never leaves a
//! half-written package behind.

use crate::request::AssemblyRequest;
use crate::StageError;
use a3dprep_grid::{asc, CoordinateFrame, ElevationGrid, LandCoverGrid};
use a3dprep_stations::{write_smet, SelectedStation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

type Result<T> = std::result::Result<T, StageError>;

/// The written package: where it is and what went into it.
#[derive(Debug)]
pub struct SimulationPackage {
    /// Package root directory (`<out_dir>/<name>`).
    pub root: PathBuf,
    /// The shared coordinate frame.
    pub frame: CoordinateFrame,
    /// Ordered identifiers of the selected stations.
    pub station_ids: Vec<String>,
    /// Fraction of the frame with valid elevation.
    pub dem_coverage: f64,
    /// Non-fatal warnings recorded in the metadata.
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
struct StationEntry {
    id: String,
    file: String,
    score: f64,
    distance_m: f64,
    elevation_diff_m: f64,
    completeness: f64,
}

#[derive(Serialize)]
struct PoiEntry {
    x: f64,
    y: f64,
    z: Option<f64>,
}

#[derive(Serialize)]
struct PackageMetadata<'a> {
    name: &'a str,
    coord_sys: &'a str,
    frame: &'a CoordinateFrame,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    poi: PoiEntry,
    dem_coverage: f64,
    stations: Vec<StationEntry>,
    warnings: &'a [String],
}

/// Write a validated package beneath `out_dir`, replacing any previous run.
pub fn write_package(
    out_dir: &Path,
    request: &AssemblyRequest,
    frame: &CoordinateFrame,
    elevation: &ElevationGrid,
    land_cover: &LandCoverGrid,
    stations: &[SelectedStation],
    dem_coverage: f64,
    warnings: &[String],
) -> Result<SimulationPackage> {
    let final_dir = out_dir.join(&request.name);
    let staging = out_dir.join(format!(".{}.staging", request.name));
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(StageError::Io)?;
    }

    let write = || -> Result<()> {
        let grids_dir = staging.join("input").join("surface-grids");
        let meteo_dir = staging.join("input").join("meteo");
        let snow_dir = staging.join("input").join("snowfiles");
        fs::create_dir_all(&grids_dir).map_err(StageError::Io)?;
        fs::create_dir_all(&meteo_dir).map_err(StageError::Io)?;
        fs::create_dir_all(&snow_dir).map_err(StageError::Io)?;
        fs::create_dir_all(staging.join("output")).map_err(StageError::Io)?;

        asc::write_elevation_file(grids_dir.join(format!("{}.dem", request.name)), elevation)
            .map_err(StageError::Grid)?;
        asc::write_land_cover_file(grids_dir.join(format!("{}.lus", request.name)), land_cover)
            .map_err(StageError::Grid)?;

        for station in stations {
            let mut file = fs::File::create(meteo_dir.join(format!("{}.smet", station.meta.id)))
                .map_err(StageError::Io)?;
            let mut buffered = std::io::BufWriter::new(&mut file);
            write_smet(&mut buffered, &station.meta, &station.series)
                .map_err(StageError::Station)?;
            buffered.flush().map_err(StageError::Io)?;
        }

        write_poi_smet(&meteo_dir, request).map_err(StageError::Io)?;

        for snowfile in &request.snowfiles {
            let file_name = snowfile
                .file_name()
                .ok_or_else(|| {
                    StageError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("snowfile path {} has no file name", snowfile.display()),
                    ))
                })?;
            fs::copy(snowfile, snow_dir.join(file_name)).map_err(StageError::Io)?;
        }

        write_io_ini(&staging, request, frame, stations).map_err(StageError::Io)?;
        write_metadata(&staging, request, frame, stations, dem_coverage, warnings)?;
        Ok(())
    };

    if let Err(err) = write() {
        // Never leave a partial package behind.
        let _ = fs::remove_dir_all(&staging);
        return Err(err);
    }

    if final_dir.exists() {
        fs::remove_dir_all(&final_dir).map_err(StageError::Io)?;
    }
    fs::rename(&staging, &final_dir).map_err(StageError::Io)?;
    info!(package = %final_dir.display(), "simulation package written");

    Ok(SimulationPackage {
        root: final_dir,
        frame: *frame,
        station_ids: stations.iter().map(|s| s.meta.id.clone()).collect(),
        dem_coverage,
        warnings: warnings.to_vec(),
    })
}

/// Generate `io.ini` with the grid, period and station wiring.
fn write_io_ini(
    staging: &Path,
    request: &AssemblyRequest,
    frame: &CoordinateFrame,
    stations: &[SelectedStation],
) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(fs::File::create(staging.join("io.ini"))?);

    writeln!(file, "[Input]")?;
    writeln!(file, "COORDSYS\t= {}", request.coord_sys)?;
    writeln!(file, "TIME_ZONE\t= 0")?;
    writeln!(file, "METEO\t= SMET")?;
    writeln!(file, "METEOPATH\t= ./input/meteo")?;
    for (i, station) in stations.iter().enumerate() {
        writeln!(file, "STATION{}\t= {}", i + 1, station.meta.id)?;
    }
    writeln!(file, "SNOW\t= SMET")?;
    writeln!(file, "SNOWPATH\t= ./input/snowfiles")?;
    writeln!(file, "GRID2D\t= ARC")?;
    writeln!(file, "GRID2DPATH\t= ./input/surface-grids")?;
    writeln!(
        file,
        "DEMFILE\t= ./input/surface-grids/{}.dem",
        request.name
    )?;
    writeln!(file, "LANDUSE\t= ARC")?;
    writeln!(
        file,
        "LANDUSEFILE\t= ./input/surface-grids/{}.lus",
        request.name
    )?;
    writeln!(file, "POI\t= SMET")?;
    writeln!(file, "POIFILE\t= ./input/meteo/poi.smet")?;
    writeln!(file)?;

    writeln!(file, "[Output]")?;
    writeln!(file, "COORDSYS\t= {}", request.coord_sys)?;
    writeln!(file, "TIME_ZONE\t= 0")?;
    writeln!(file, "EXPERIMENT\t= {}", request.name)?;
    writeln!(file, "METEO\t= SMET")?;
    writeln!(file, "METEOPATH\t= ./output")?;
    writeln!(file, "GRID2D\t= ARC")?;
    writeln!(file, "GRID2DPATH\t= ./output")?;
    writeln!(file)?;

    writeln!(file, "[Simulation]")?;
    writeln!(
        file,
        "START_DATE\t= {}",
        request.start.format("%Y-%m-%dT%H:%M:%S")
    )?;
    writeln!(
        file,
        "END_DATE\t= {}",
        request.end.format("%Y-%m-%dT%H:%M:%S")
    )?;
    writeln!(file, "NCOLS\t= {}", frame.ncols)?;
    writeln!(file, "NROWS\t= {}", frame.nrows)?;
    writeln!(file, "CELLSIZE\t= {:.3}", frame.cell_size)?;
    writeln!(file, "XLLCORNER\t= {:.3}", frame.origin_x)?;
    writeln!(file, "YLLCORNER\t= {:.3}", frame.origin_y)?;
    writeln!(file, "EPSG\t= {}", frame.epsg)?;

    file.flush()
}

/// Generate `poi.smet` listing the point of interest.
fn write_poi_smet(meteo_dir: &Path, request: &AssemblyRequest) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(fs::File::create(meteo_dir.join("poi.smet"))?);
    let epsg = a3dprep_grid::transforms::epsg_from_coord_sys(&request.coord_sys)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;

    writeln!(file, "SMET 1.1 ASCII")?;
    writeln!(file, "[HEADER]")?;
    writeln!(file, "station_id = poi")?;
    writeln!(file, "epsg = {}", epsg)?;
    writeln!(file, "nodata = -999")?;
    writeln!(file, "fields = easting northing altitude")?;
    writeln!(file, "[DATA]")?;
    writeln!(
        file,
        "{:.2} {:.2} {:.2}",
        request.poi.x,
        request.poi.y,
        request.poi.z.unwrap_or(-999.0)
    )?;
    file.flush()
}

/// Generate `metadata.json` with the frame, stations and warnings.
fn write_metadata(
    staging: &Path,
    request: &AssemblyRequest,
    frame: &CoordinateFrame,
    stations: &[SelectedStation],
    dem_coverage: f64,
    warnings: &[String],
) -> Result<()> {
    let metadata = PackageMetadata {
        name: &request.name,
        coord_sys: &request.coord_sys,
        frame,
        start: request.start,
        end: request.end,
        poi: PoiEntry {
            x: request.poi.x,
            y: request.poi.y,
            z: request.poi.z,
        },
        dem_coverage,
        stations: stations
            .iter()
            .map(|s| StationEntry {
                id: s.meta.id.clone(),
                file: format!("input/meteo/{}.smet", s.meta.id),
                score: s.score,
                distance_m: s.distance_m,
                elevation_diff_m: s.elevation_diff_m,
                completeness: s.completeness,
            })
            .collect(),
        warnings,
    };
    let json = serde_json::to_vec_pretty(&metadata).map_err(|err| {
        StageError::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
    })?;
    fs::write(staging.join("metadata.json"), json).map_err(StageError::Io)?;
    Ok(())
}
