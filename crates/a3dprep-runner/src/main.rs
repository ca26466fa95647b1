//! `a3dprep` - assemble a complete Alpine3D / Snowpack input package.
//!
//! Reads a YAML request describing the region, period and point of
//! interest, fetches and aligns the elevation and land-cover rasters,
//! selects forcing stations, and writes the package directory the solvers
//! expect. The solvers themselves are run by the user afterwards.

use a3dprep_assembly::{AssemblyRequest, CancelToken, Orchestrator, PipelineSources};
use a3dprep_cache::{FetchCache, RetryPolicy};
use a3dprep_dem::HttpTileSource;
use a3dprep_landcover::HttpLandCoverSource;
use a3dprep_stations::{HttpStationCatalog, HttpStationDataSource};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Assemble Alpine3D / Snowpack simulation inputs for a region and period.
#[derive(Debug, Parser)]
#[command(name = "a3dprep", version, about)]
struct Args {
    /// Path to the YAML assembly request.
    request: PathBuf,

    /// Directory the package is written into.
    #[arg(long, default_value = "./output")]
    out_dir: PathBuf,

    /// Directory for the shared fetch cache.
    #[arg(long, default_value = "./cache")]
    cache_dir: PathBuf,

    /// Base URL of the elevation tile pyramid.
    #[arg(long, default_value = "https://s3.amazonaws.com/elevation-tiles-prod/geotiff")]
    dem_url: String,

    /// Base URL of the land-cover service.
    #[arg(long, default_value = "https://landcover.geo.example.org/wcs")]
    landcover_url: String,

    /// Base URL of the station catalog and data service.
    #[arg(long, default_value = "https://stations.geo.example.org/api")]
    station_url: String,

    /// Network timeout per request, in seconds.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let request: AssemblyRequest = serde_yaml::from_str(&std::fs::read_to_string(&args.request)?)?;
    info!(request = %args.request.display(), name = %request.name, "loaded assembly request");

    let timeout = Duration::from_secs(args.timeout_secs);
    let retry = RetryPolicy::default();
    let cache = FetchCache::open(&args.cache_dir)?;

    let tiles = HttpTileSource::new(&args.dem_url, timeout, retry.clone())?;
    let land_cover = HttpLandCoverSource::new(&args.landcover_url, timeout, retry.clone(), &cache)?;
    let catalog = HttpStationCatalog::new(&args.station_url, timeout, retry.clone(), &cache)?;
    let station_data = HttpStationDataSource::new(&args.station_url, timeout, retry)?;

    let sources = PipelineSources {
        tiles: &tiles,
        land_cover: &land_cover,
        catalog: &catalog,
        station_data: &station_data,
        cache: &cache,
    };

    let cancel = CancelToken::new();
    let ctrlc_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("interrupt received, cancelling at the next stage boundary");
        ctrlc_cancel.cancel();
    })?;

    let mut orchestrator = Orchestrator::new();
    match orchestrator.run(&request, &sources, &args.out_dir, &cancel) {
        Ok(package) => {
            println!("package written: {}", package.root.display());
            println!(
                "frame: {}x{} cells at {} m, EPSG:{}",
                package.frame.ncols, package.frame.nrows, package.frame.cell_size, package.frame.epsg
            );
            println!("stations: {}", package.station_ids.join(", "));
            for warning in &package.warnings {
                println!("warning: {warning}");
            }
            let stats = tiles.stats();
            info!(
                tiles = stats.tiles_downloaded,
                bytes = stats.bytes_downloaded,
                "download statistics"
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(if err.is_cancelled() { 130 } else { 1 });
        }
    }
}
