//! # Wavefront Core
//!
//! Propagation of optical fields between planar cross-sections, and the
//! optical elements that act on them.
//!
//! ## Architecture
//!
//! Every field variant implements [`fields::OpticalField`]. Propagation onto a
//! destination [`geometry::PlanarGeometry`] builds a
//! [`propagation::PropagationPlan`] (angular spectrum, direct integration,
//! separable Fresnel/Fraunhofer transforms) and applies it to each planar
//! slice of the field data. Heavy numerics (FFTs, parallel fills) are routed
//! through a [`wavefront_compute::ComputeBackend`] carried by each field.
//!
//! ## Modules
//!
//! - [`geometry`]: Planar sampling grids.
//! - [`fields`]: Scalar, polarized and coherence fields.
//! - [`propagation`]: Diffraction methods and resampling.
//! - [`elements`]: Modulators, polarizers, beam splitters, detectors.
//! - [`profiles`]: Analytic initial data (Gaussian, Hermite–Gaussian, apertures).
//! - [`types`]: Option enums and small value types.
//! - [`config`]: Process-wide default grid spacing.
//! - [`error`]: Error type shared by all modules.

pub mod config;
pub mod elements;
pub mod error;
pub mod fields;
pub mod geometry;
pub mod profiles;
pub mod propagation;
pub mod types;

pub use error::{OpticsError, Result};

/// Traits needed to call field and element methods.
pub mod prelude {
    pub use crate::elements::{Element, ModulationElement, PolarizedModulationElement, Transform};
    pub use crate::fields::{CoherentField, OpticalField};
    pub use crate::geometry::Planar;
}
