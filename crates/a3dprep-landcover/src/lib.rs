//! # a3dprep-landcover
//!
//! Land-cover provider for the input-assembly pipeline.
//!
//! A [`LandCoverSource`] answers a bounding-box request with a categorical
//! raster; the [`LandCoverProvider`] resamples it onto the request's
//! coordinate frame by majority class (categorical codes are never
//! averaged) and maps source codes onto the PREVAH class set the solver
//! expects through a closed [`ClassMap`]. Codes missing from the mapping
//! fail the fetch rather than being silently dropped.
//!
//! Two sources are provided: [`HttpLandCoverSource`] for a remote
//! classified dataset (responses cached through the shared fetch cache) and
//! [`ConstantLandCoverSource`] for regions without classified data.

mod error;
mod legend;
mod provider;
mod source;

pub use error::LandCoverError;
pub use legend::ClassMap;
pub use provider::LandCoverProvider;
pub use source::{ConstantLandCoverSource, HttpLandCoverSource, LandCoverSource, SourceRaster};

/// Result type for land-cover operations.
pub type Result<T> = std::result::Result<T, LandCoverError>;
