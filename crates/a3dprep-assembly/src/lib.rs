//! # a3dprep-assembly
//!
//! The orchestrator that turns a request into a complete Alpine3D /
//! Snowpack input package.
//!
//! One [`Orchestrator::run`] call establishes the coordinate frame from the
//! region of interest, fetches the elevation and land-cover grids and the
//! station catalog concurrently, scores and materializes forcing stations
//! (after the elevation stage, whose mean elevation the scoring needs),
//! validates cross-consistency, and writes the package directory the
//! solver expects. Progress is an explicit [`Stage`] value; any fatal error
//! moves the run to [`Stage::Failed`] with a structured [`AssemblyError`]
//! naming the stage that failed, and cancellation via [`CancelToken`] takes
//! effect at the next stage boundary without leaving partial output.

mod error;
mod orchestrator;
mod package;
mod request;
mod stage;

pub use error::{AssemblyError, StageError, ValidationError};
pub use orchestrator::{CancelToken, Orchestrator, PipelineSources};
pub use package::SimulationPackage;
pub use request::{AssemblyRequest, LandCoverSelector, PoiSpec, RoiSpec};
pub use stage::Stage;

/// Result type for assembly runs.
pub type Result<T> = std::result::Result<T, AssemblyError>;
