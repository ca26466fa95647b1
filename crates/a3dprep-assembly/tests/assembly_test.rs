//! End-to-end tests for the assembly pipeline.
//!
//! The pipeline runs against in-memory collaborators: a tile source that
//! encodes synthetic GeoTIFF elevation tiles, a fixed land-cover raster,
//! and a small station catalog with scripted gaps. The tests cover the
//! pipeline's core guarantees: frame alignment across rasters, the package
//! layout, deterministic station selection, explicit gap handling, and
//! that validation failures and cancellation leave no package behind.

use a3dprep_assembly::{
    AssemblyError, AssemblyRequest, CancelToken, Orchestrator, PipelineSources, Stage, StageError,
    ValidationError,
};
use a3dprep_cache::FetchCache;
use a3dprep_dem::{TileCoord, TileSource};
use a3dprep_landcover::{ClassMap, LandCoverSource, SourceRaster};
use a3dprep_stations::{
    DateRange, RawField, RawRecord, RawSeries, StationCatalog, StationDataSource, StationError,
    StationMeta, Unit,
};
use chrono::{TimeZone, Utc};
use std::io::Cursor;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};

// ============================================================================
// Fake collaborators
// ============================================================================

/// Tile source encoding a flat synthetic elevation tile on demand.
struct FlatTiles {
    elevation: f32,
}

impl TileSource for FlatTiles {
    fn fetch_tile(&self, _coord: TileCoord) -> a3dprep_dem::Result<Option<Vec<u8>>> {
        let data = vec![self.elevation; 32 * 32];
        let mut bytes = Cursor::new(Vec::new());
        let mut encoder = TiffEncoder::new(&mut bytes).expect("encoder");
        encoder
            .write_image::<colortype::Gray32Float>(32, 32, &data)
            .expect("encode tile");
        Ok(Some(bytes.into_inner()))
    }

    fn origin(&self, coord: TileCoord) -> String {
        format!("test://tiles/{coord}")
    }
}

/// Land-cover source answering every request with a grassland raster.
struct GrassLandCover;

impl LandCoverSource for GrassLandCover {
    fn fetch_region(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        _epsg: u32,
    ) -> a3dprep_landcover::Result<SourceRaster> {
        Ok(SourceRaster {
            data: vec![21; 64 * 64],
            width: 64,
            height: 64,
            min_x,
            min_y,
            max_x,
            max_y,
            nodata: None,
        })
    }

    fn class_map(&self) -> ClassMap {
        ClassMap::lc27()
    }
}

/// Catalog with a fixed station list.
struct FixedCatalog {
    stations: Vec<StationMeta>,
}

impl StationCatalog for FixedCatalog {
    fn query(
        &self,
        _roi: &a3dprep_grid::Roi,
        _radius_m: f64,
    ) -> a3dprep_stations::Result<Vec<StationMeta>> {
        Ok(self.stations.clone())
    }
}

/// Hourly temperature series with every 10th record missing.
struct GappyData;

impl StationDataSource for GappyData {
    fn fetch_series(
        &self,
        _station: &StationMeta,
        range: &DateRange,
    ) -> a3dprep_stations::Result<RawSeries> {
        let mut records = Vec::new();
        for (i, ts) in range.timestamps(60).into_iter().enumerate() {
            if i % 10 == 9 {
                continue;
            }
            records.push(RawRecord {
                timestamp: ts,
                values: vec![Some(-7.5)],
            });
        }
        Ok(RawSeries {
            fields: vec![RawField {
                name: "TA".to_string(),
                unit: Unit::Celsius,
            }],
            records,
        })
    }
}

fn station(id: &str, easting: f64, northing: f64, elevation_m: f64) -> StationMeta {
    StationMeta {
        id: id.to_string(),
        name: format!("station {id}"),
        easting,
        northing,
        epsg: 2056,
        elevation_m,
        variables: vec!["TA".to_string()],
        coverage_start: Utc.with_ymd_and_hms(1996, 9, 1, 0, 0, 0).unwrap(),
        coverage_end: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        sample_step_minutes: 60,
    }
}

fn default_stations() -> Vec<StationMeta> {
    vec![
        station("DAV", 2_783_800.0, 1_187_400.0, 1594.0),
        station("WFJ", 2_780_850.0, 1_189_230.0, 2536.0),
        station("KLO", 2_787_500.0, 1_192_300.0, 2147.0),
    ]
}

fn request() -> AssemblyRequest {
    serde_yaml::from_str(
        r#"
name: dischma
roi:
  center: [2780000.0, 1190000.0]
  size_m: 1000
cell_size: 25
start: 2023-01-01T00:00:00Z
end: 2023-01-10T23:00:00Z
poi:
  x: 2780100.0
  y: 1190200.0
  z: 2100.0
max_stations: 2
"#,
    )
    .expect("request parses")
}

/// Run the pipeline with the default fakes into a fresh temp dir.
fn run_pipeline(
    request: &AssemblyRequest,
    stations: Vec<StationMeta>,
    out_dir: &Path,
    cache_dir: &Path,
    cancel: &CancelToken,
) -> (Orchestrator, Result<a3dprep_assembly::SimulationPackage, AssemblyError>) {
    let cache = FetchCache::open(cache_dir).expect("cache opens");
    let tiles = FlatTiles { elevation: 2100.0 };
    let land_cover = GrassLandCover;
    let catalog = FixedCatalog { stations };
    let data = GappyData;
    let sources = PipelineSources {
        tiles: &tiles,
        land_cover: &land_cover,
        catalog: &catalog,
        station_data: &data,
        cache: &cache,
    };
    let mut orchestrator = Orchestrator::new();
    let result = orchestrator.run(request, &sources, out_dir, cancel);
    (orchestrator, result)
}

// ============================================================================
// Success path
// ============================================================================

#[test]
fn full_run_writes_the_expected_package_layout() {
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let snow = tempfile::tempdir().unwrap();
    let snowfile = snow.path().join("dischma_21.sno");
    std::fs::write(&snowfile, "[Header]\nstationID = WFJ\n").unwrap();

    let mut req = request();
    req.snowfiles.push(snowfile);
    let (orchestrator, result) = run_pipeline(
        &req,
        default_stations(),
        out.path(),
        cache.path(),
        &CancelToken::new(),
    );

    let package = result.expect("pipeline succeeds");
    assert_eq!(orchestrator.stage(), Stage::Packaged);
    assert_eq!((package.frame.ncols, package.frame.nrows), (40, 40));
    assert_eq!(package.dem_coverage, 1.0);

    let root = &package.root;
    assert!(root.ends_with("dischma"));
    assert!(root.join("io.ini").is_file());
    assert!(root.join("metadata.json").is_file());
    assert!(root.join("input/surface-grids/dischma.dem").is_file());
    assert!(root.join("input/surface-grids/dischma.lus").is_file());
    assert!(root.join("input/meteo/poi.smet").is_file());
    assert!(root.join("input/snowfiles/dischma_21.sno").is_file());
    assert!(root.join("output").is_dir());
    assert_eq!(std::fs::read_dir(root.join("output")).unwrap().count(), 0);

    for id in &package.station_ids {
        assert!(root.join(format!("input/meteo/{id}.smet")).is_file());
    }
    assert_eq!(package.station_ids.len(), 2);
}

#[test]
fn rasters_share_one_frame_geometry() {
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let (_, result) = run_pipeline(
        &request(),
        default_stations(),
        out.path(),
        cache.path(),
        &CancelToken::new(),
    );
    let package = result.unwrap();

    let dem = std::fs::read_to_string(package.root.join("input/surface-grids/dischma.dem")).unwrap();
    let lus = std::fs::read_to_string(package.root.join("input/surface-grids/dischma.lus")).unwrap();
    // Identical six-line ARC headers: same dims, origin, cell size.
    let dem_header: Vec<&str> = dem.lines().take(6).collect();
    let lus_header: Vec<&str> = lus.lines().take(6).collect();
    assert_eq!(dem_header, lus_header);
    assert_eq!(dem_header[0], "ncols         40");
    assert_eq!(dem_header[1], "nrows         40");
    assert_eq!(dem_header[4], "cellsize      25.000");
}

#[test]
fn station_series_cover_the_exact_range_with_explicit_gaps() {
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let (_, result) = run_pipeline(
        &request(),
        default_stations(),
        out.path(),
        cache.path(),
        &CancelToken::new(),
    );
    let package = result.unwrap();

    let smet = std::fs::read_to_string(
        package
            .root
            .join(format!("input/meteo/{}.smet", package.station_ids[0])),
    )
    .unwrap();
    let data_rows: Vec<&str> = smet
        .lines()
        .skip_while(|line| *line != "[DATA]")
        .skip(1)
        .collect();
    // 10 days of hourly data, both endpoints included.
    assert_eq!(data_rows.len(), 240);
    let nodata_rows = data_rows.iter().filter(|l| l.ends_with(" -999")).count();
    assert_eq!(nodata_rows, 24);
    assert!(data_rows[0].starts_with("2023-01-01T00:00:00 "));
    assert!(data_rows[239].starts_with("2023-01-10T23:00:00 "));
}

#[test]
fn io_ini_lists_grid_period_and_stations() {
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let (_, result) = run_pipeline(
        &request(),
        default_stations(),
        out.path(),
        cache.path(),
        &CancelToken::new(),
    );
    let package = result.unwrap();

    let ini = std::fs::read_to_string(package.root.join("io.ini")).unwrap();
    assert!(ini.contains("COORDSYS\t= CH1903+"));
    assert!(ini.contains("DEMFILE\t= ./input/surface-grids/dischma.dem"));
    assert!(ini.contains("LANDUSEFILE\t= ./input/surface-grids/dischma.lus"));
    assert!(ini.contains(&format!("STATION1\t= {}", package.station_ids[0])));
    assert!(ini.contains(&format!("STATION2\t= {}", package.station_ids[1])));
    assert!(ini.contains("START_DATE\t= 2023-01-01T00:00:00"));
    assert!(ini.contains("END_DATE\t= 2023-01-10T23:00:00"));
    assert!(ini.contains("NCOLS\t= 40"));
    assert!(ini.contains("NROWS\t= 40"));
}

#[test]
fn runs_are_deterministic() {
    let out_a = tempfile::tempdir().unwrap();
    let out_b = tempfile::tempdir().unwrap();
    let cache_a = tempfile::tempdir().unwrap();
    let cache_b = tempfile::tempdir().unwrap();

    let (_, first) = run_pipeline(
        &request(),
        default_stations(),
        out_a.path(),
        cache_a.path(),
        &CancelToken::new(),
    );
    let (_, second) = run_pipeline(
        &request(),
        default_stations(),
        out_b.path(),
        cache_b.path(),
        &CancelToken::new(),
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.station_ids, second.station_ids);

    let dem_a = std::fs::read(first.root.join("input/surface-grids/dischma.dem")).unwrap();
    let dem_b = std::fs::read(second.root.join("input/surface-grids/dischma.dem")).unwrap();
    assert_eq!(dem_a, dem_b);
}

#[test]
fn elevation_nodata_never_reaches_a_fully_covered_frame() {
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let (_, result) = run_pipeline(
        &request(),
        default_stations(),
        out.path(),
        cache.path(),
        &CancelToken::new(),
    );
    let package = result.unwrap();
    let dem = std::fs::read_to_string(package.root.join("input/surface-grids/dischma.dem")).unwrap();
    assert!(!dem
        .lines()
        .skip(6)
        .any(|line| line.split(' ').any(|v| v == "-9999")));
}

// ============================================================================
// Failure paths
// ============================================================================

#[test]
fn poi_outside_frame_fails_validation_with_no_package() {
    let mut req = request();
    req.poi.x = 2_900_000.0;
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let (orchestrator, result) = run_pipeline(
        &req,
        default_stations(),
        out.path(),
        cache.path(),
        &CancelToken::new(),
    );

    let err = result.unwrap_err();
    assert_eq!(orchestrator.stage(), Stage::Failed);
    assert_eq!(err.stage, Stage::Packaged);
    assert!(matches!(
        err.source,
        StageError::Validation(ValidationError::PoiOutsideFrame { .. })
    ));
    // Nothing was written, not even a staging directory.
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn empty_catalog_is_fatal_with_no_package() {
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let (orchestrator, result) = run_pipeline(
        &request(),
        Vec::new(),
        out.path(),
        cache.path(),
        &CancelToken::new(),
    );

    let err = result.unwrap_err();
    assert_eq!(orchestrator.stage(), Stage::Failed);
    assert!(matches!(
        err.source,
        StageError::Station(StationError::NoStationsAvailable { .. })
    ));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn cancellation_aborts_at_the_first_boundary() {
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let (orchestrator, result) = run_pipeline(
        &request(),
        default_stations(),
        out.path(),
        cache.path(),
        &cancel,
    );

    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(orchestrator.stage(), Stage::Failed);
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn rerun_replaces_the_previous_package() {
    let out = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let (_, first) = run_pipeline(
        &request(),
        default_stations(),
        out.path(),
        cache.path(),
        &CancelToken::new(),
    );
    let first = first.unwrap();
    let marker = first.root.join("output").join("leftover.txt");
    std::fs::write(&marker, "from a previous solver run").unwrap();

    let (_, second) = run_pipeline(
        &request(),
        default_stations(),
        out.path(),
        cache.path(),
        &CancelToken::new(),
    );
    let second = second.unwrap();
    assert_eq!(first.root, second.root);
    // The package was replaced wholesale, not merged.
    assert!(!marker.exists());
}
