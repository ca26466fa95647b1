//! The assembly orchestrator: drives the pipeline stages in order.
//!
//! The three network-bound fetches with no mutual dependency (elevation
//! tiles, land cover, station catalog) run as concurrent scoped threads;
//! station *scoring* waits for the elevation grid because it needs the mean
//! region elevation. After the gather point the orchestrator proceeds
//! strictly sequentially through its stage machine, holds no locks of its
//! own, and checks for cooperative cancellation at every stage boundary.

use crate::error::{StageError, ValidationError};
use crate::package::{write_package, SimulationPackage};
use crate::request::{AssemblyRequest, LandCoverSelector};
use crate::{AssemblyError, Stage};
use a3dprep_cache::FetchCache;
use a3dprep_dem::{DemConfig, DemOutcome, DemProvider, TileSource};
use a3dprep_grid::{CoordinateFrame, LandCoverGrid};
use a3dprep_landcover::{ConstantLandCoverSource, LandCoverProvider, LandCoverSource};
use a3dprep_stations::{
    SelectedStation, SelectorConfig, StationCatalog, StationDataSource, StationMeta,
    StationSelector,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Cooperative cancellation flag, checked at stage boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next stage boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The external collaborators a run draws on.
pub struct PipelineSources<'a> {
    /// Elevation tile source.
    pub tiles: &'a dyn TileSource,
    /// Remote land-cover source (used when the request selects it).
    pub land_cover: &'a dyn LandCoverSource,
    /// Station catalog.
    pub catalog: &'a dyn StationCatalog,
    /// Station time-series source.
    pub station_data: &'a dyn StationDataSource,
    /// Shared fetch cache, passed by reference into the providers.
    pub cache: &'a FetchCache,
}

/// Drives one assembly run through the stage machine.
#[derive(Debug)]
pub struct Orchestrator {
    stage: Stage,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Create an orchestrator in the initial stage.
    pub fn new() -> Self {
        Self {
            stage: Stage::Initialized,
        }
    }

    /// Current stage of the run.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Execute the pipeline and write the package beneath `out_dir`.
    ///
    /// On any fatal error the orchestrator moves to [`Stage::Failed`] and
    /// returns a single structured error naming the stage that failed; no
    /// partially written package remains on disk.
    pub fn run(
        &mut self,
        request: &AssemblyRequest,
        sources: &PipelineSources<'_>,
        out_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<SimulationPackage, AssemblyError> {
        match self.run_inner(request, sources, out_dir, cancel) {
            Ok(package) => Ok(package),
            Err(err) => {
                self.stage = Stage::Failed;
                if err.is_cancelled() {
                    info!(stage = %err.stage, "assembly cancelled");
                } else {
                    warn!(stage = %err.stage, error = %err.source, "assembly failed");
                }
                Err(err)
            }
        }
    }

    fn run_inner(
        &mut self,
        request: &AssemblyRequest,
        sources: &PipelineSources<'_>,
        out_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<SimulationPackage, AssemblyError> {
        // Errors carry the stage whose work failed.
        let fail = |stage: Stage, source: StageError| AssemblyError { stage, source };

        // Stage: Initialized -> FrameEstablished.
        self.checkpoint(cancel)?;
        request
            .validate_name()
            .map_err(|e| fail(Stage::FrameEstablished, e.into()))?;
        let roi = request
            .roi()
            .map_err(|e| fail(Stage::FrameEstablished, e.into()))?;
        let range = request
            .date_range()
            .map_err(|e| fail(Stage::FrameEstablished, e.into()))?;
        let frame = CoordinateFrame::from_roi(&roi, request.cell_size)
            .map_err(|e| fail(Stage::FrameEstablished, e.into()))?;
        info!(%frame, name = %request.name, "coordinate frame established");
        self.advance();

        // Concurrent fetch phase: elevation, land cover and the station
        // catalog query are independent; gather all three before the
        // sequential stages.
        self.checkpoint(cancel)?;
        let constant_source;
        let land_cover_source: &dyn LandCoverSource = match request.land_cover {
            LandCoverSelector::Remote => sources.land_cover,
            LandCoverSelector::Constant { code } => {
                constant_source = ConstantLandCoverSource { code };
                &constant_source
            }
        };

        let dem_provider = DemProvider::new(
            sources.tiles,
            sources.cache,
            DemConfig {
                zoom: request.dem_zoom,
                min_coverage: request.min_coverage,
            },
        );
        let land_cover_provider = LandCoverProvider::new(land_cover_source);
        let selector = StationSelector::new(
            sources.catalog,
            sources.station_data,
            SelectorConfig {
                search_radius_m: request.search_radius_m,
                min_completeness: request.min_completeness,
                weights: request.scoring,
            },
        );

        let (dem_result, land_cover_result, candidates_result) = std::thread::scope(|scope| {
            let dem_task = scope.spawn(|| dem_provider.fetch_elevation(&frame));
            let land_cover_task = scope.spawn(|| land_cover_provider.fetch_land_cover(&frame));
            let catalog_task = scope.spawn(|| selector.query_candidates(&roi));
            (
                dem_task.join().expect("elevation task panicked"),
                land_cover_task.join().expect("land-cover task panicked"),
                catalog_task.join().expect("catalog task panicked"),
            )
        });

        // Stage: FrameEstablished -> ElevationReady.
        self.checkpoint(cancel)?;
        let DemOutcome {
            grid: elevation,
            coverage,
            warnings: dem_warnings,
        } = dem_result.map_err(|e| fail(Stage::ElevationReady, e.into()))?;
        let warnings: Vec<String> = dem_warnings.iter().map(|w| w.to_string()).collect();
        self.advance();

        // Stage: ElevationReady -> LandCoverReady.
        self.checkpoint(cancel)?;
        let land_cover = land_cover_result.map_err(|e| fail(Stage::LandCoverReady, e.into()))?;
        self.advance();

        // Stage: LandCoverReady -> StationsReady. Scoring needs the mean
        // region elevation, which is why it runs after the elevation stage.
        self.checkpoint(cancel)?;
        let candidates: Vec<StationMeta> =
            candidates_result.map_err(|e| fail(Stage::StationsReady, e.into()))?;
        let mean_elevation = elevation.mean_elevation().unwrap_or(0.0);
        let stations = selector
            .select_from_candidates(candidates, &roi, &range, mean_elevation, request.max_stations)
            .map_err(|e| fail(Stage::StationsReady, e.into()))?;
        self.advance();

        // Stage: StationsReady -> Packaged. Validate cross-consistency
        // before any file is written.
        self.checkpoint(cancel)?;
        validate(request, &frame, &elevation, &land_cover, &stations)
            .map_err(|e| fail(Stage::Packaged, e.into()))?;
        let package = write_package(
            out_dir,
            request,
            &frame,
            &elevation,
            &land_cover,
            &stations,
            coverage,
            &warnings,
        )
        .map_err(|e| fail(Stage::Packaged, e))?;
        self.advance();

        info!(stage = %self.stage, package = %package.root.display(), "assembly complete");
        Ok(package)
    }

    /// Abort at a stage boundary when cancellation was requested.
    fn checkpoint(&self, cancel: &CancelToken) -> Result<(), AssemblyError> {
        if cancel.is_cancelled() {
            Err(AssemblyError {
                stage: self.stage,
                source: StageError::Cancelled,
            })
        } else {
            Ok(())
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.advance() {
            self.stage = next;
        }
    }
}

/// Cross-consistency checks performed before packaging.
fn validate(
    request: &AssemblyRequest,
    frame: &CoordinateFrame,
    elevation: &a3dprep_grid::ElevationGrid,
    land_cover: &LandCoverGrid,
    stations: &[SelectedStation],
) -> Result<(), ValidationError> {
    if !frame.contains(request.poi.x, request.poi.y) {
        return Err(ValidationError::PoiOutsideFrame {
            x: request.poi.x,
            y: request.poi.y,
        });
    }
    if stations.is_empty() {
        return Err(ValidationError::NoStations);
    }
    if !elevation.frame().same_geometry(land_cover.frame())
        || !elevation.frame().same_geometry(frame)
    {
        return Err(ValidationError::FrameMismatch {
            elevation: elevation.frame().to_string(),
            land_cover: land_cover.frame().to_string(),
        });
    }
    for code in land_cover.present_codes() {
        if !land_cover.legend().contains(code) {
            return Err(ValidationError::LegendUnresolved(code));
        }
    }
    Ok(())
}
