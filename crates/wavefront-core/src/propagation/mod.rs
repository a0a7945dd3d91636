//! Propagation engine.
//!
//! A [`PropagationPlan`] carries planar data sampled on a source geometry to a
//! destination geometry. All validation and kernel assembly happen in
//! [`PropagationPlan::new`]; [`PropagationPlan::apply`] then maps any number
//! of slices (one for a scalar field, three for a polarized field, one per
//! coordinate pair for a coherence field).
//!
//! | Method | Stage |
//! |--------|-------|
//! | ASM, ASM_FRESNEL | padded FFT with transfer function, then resample |
//! | DIM, DIM_FRESNEL | FFT convolution onto an intermediate plane, then resample |
//! | FRESNEL_ONE_STEP, FRESNEL_TWO_STEP, FRAUNHOFER | separable matrix products on the destination |
//! | any, with $\Delta z = 0$ | resample only |

pub mod asm;
pub mod dim;
pub mod fresnel;
pub mod interpolate;

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use wavefront_compute::ComputeBackend;

use crate::error::{validate_wavelength, OpticsError, Result};
use crate::geometry::PlanarGeometry;
use crate::types::{PropagationMethod, PropagationOptions};

use self::asm::{padded_geometry, SpectralStage};
use self::dim::{intermediate_geometry, ConvolutionStage};
use self::fresnel::{SeparableKind, SeparableStage};
pub use self::interpolate::{resample, Resampler};

enum Stage {
    Resample(Resampler),
    Spectral(SpectralStage, Resampler),
    Convolution(ConvolutionStage, Resampler),
    Separable(SeparableStage),
}

/// Precomputed propagation between two planar geometries.
pub struct PropagationPlan {
    source: PlanarGeometry,
    destination: PlanarGeometry,
    wavelength: f64,
    method: PropagationMethod,
    stage: Stage,
    backend: Arc<dyn ComputeBackend>,
}

impl PropagationPlan {
    /// Validate the propagation and precompute its kernels.
    ///
    /// # Arguments
    /// * `source` - Grid the input slices are sampled on.
    /// * `destination` - Grid of the output slices; its `z` sets the distance.
    /// * `wavelength` - Vacuum wavelength, same length unit as the grids.
    /// * `options` - Method, interpolation mode and ASM padding.
    /// * `backend` - Device that executes transforms and kernel fills.
    ///
    /// # Errors
    /// [`OpticsError::InvalidParameter`] for a bad wavelength and
    /// [`OpticsError::OutOfBounds`] when the destination is not covered by the
    /// region the method reconstructs.
    pub fn new(
        source: &PlanarGeometry,
        destination: &PlanarGeometry,
        wavelength: f64,
        options: &PropagationOptions,
        backend: Arc<dyn ComputeBackend>,
    ) -> Result<Self> {
        validate_wavelength(wavelength)?;
        let dz = destination.z() - source.z();
        let method = match options.method {
            PropagationMethod::Auto => select_auto(source, destination, wavelength, options),
            m => m,
        };

        let stage = if dz == 0.0 {
            Stage::Resample(Resampler::new(source, destination, options.interpolation)?)
        } else {
            match method {
                PropagationMethod::Asm | PropagationMethod::AsmFresnel | PropagationMethod::Auto => {
                    let pad = options
                        .asm_pad_factor
                        .resolve(source.shape(), source.spacing(), wavelength, dz);
                    log::debug!("ASM padding {:?} ({})", pad, options.asm_pad_factor);
                    let natural = padded_geometry(source, pad, destination.z())?;
                    let resampler = Resampler::new(&natural, destination, options.interpolation)?;
                    let paraxial = method == PropagationMethod::AsmFresnel;
                    let stage = SpectralStage::new(source, dz, wavelength, pad, paraxial, &backend)?;
                    Stage::Spectral(stage, resampler)
                }
                PropagationMethod::Dim | PropagationMethod::DimFresnel => {
                    let intermediate = intermediate_geometry(source, destination)?;
                    let resampler = Resampler::new(&intermediate, destination, options.interpolation)?;
                    let paraxial = method == PropagationMethod::DimFresnel;
                    let stage = ConvolutionStage::new(source, &intermediate, dz, wavelength, paraxial, &backend)?;
                    Stage::Convolution(stage, resampler)
                }
                PropagationMethod::FresnelOneStep => Stage::Separable(SeparableStage::new(
                    source,
                    destination,
                    dz,
                    wavelength,
                    SeparableKind::OneStep,
                    &backend,
                )?),
                PropagationMethod::FresnelTwoStep => Stage::Separable(SeparableStage::new(
                    source,
                    destination,
                    dz,
                    wavelength,
                    SeparableKind::TwoStep,
                    &backend,
                )?),
                PropagationMethod::Fraunhofer => Stage::Separable(SeparableStage::new(
                    source,
                    destination,
                    dz,
                    wavelength,
                    SeparableKind::Fraunhofer,
                    &backend,
                )?),
            }
        };

        log::debug!(
            "Planned {} propagation over dz = {:.4e}: {} -> {}",
            method,
            dz,
            source.geometry_str(),
            destination.geometry_str()
        );

        Ok(Self {
            source: *source,
            destination: *destination,
            wavelength,
            method,
            stage,
            backend,
        })
    }

    pub fn source(&self) -> &PlanarGeometry {
        &self.source
    }

    pub fn destination(&self) -> &PlanarGeometry {
        &self.destination
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    /// The method actually used; never [`PropagationMethod::Auto`].
    pub fn method(&self) -> PropagationMethod {
        self.method
    }

    pub fn backend(&self) -> &Arc<dyn ComputeBackend> {
        &self.backend
    }

    /// Propagate one planar slice sampled on the source geometry.
    pub fn apply(&self, data: ArrayView2<'_, Complex64>) -> Result<Array2<Complex64>> {
        let (rows, cols) = data.dim();
        if [rows, cols] != self.source.shape() {
            return Err(OpticsError::ShapeMismatch {
                left: vec![rows, cols],
                right: self.source.shape().to_vec(),
            });
        }
        let backend = &self.backend;
        match &self.stage {
            Stage::Resample(resampler) => resampler.apply(data, backend),
            Stage::Spectral(stage, resampler) => {
                let natural = stage.apply(data, backend)?;
                resampler.apply(natural.view(), backend)
            }
            Stage::Convolution(stage, resampler) => {
                let intermediate = stage.apply(data, backend)?;
                resampler.apply(intermediate.view(), backend)
            }
            Stage::Separable(stage) => stage.apply(data, backend),
        }
    }

    /// Apply the complex-conjugate operator, `conj(P conj(data))`.
    ///
    /// This is how the second coordinate pair of a mutual coherence function
    /// is propagated.
    pub fn apply_conjugate(&self, data: ArrayView2<'_, Complex64>) -> Result<Array2<Complex64>> {
        let conjugated = data.mapv(|v| v.conj());
        let mut out = self.apply(conjugated.view())?;
        out.mapv_inplace(|v| v.conj());
        Ok(out)
    }
}

/// ASM when the destination fits the padded grid and the distance is within
/// the transfer-function sampling limit $|\Delta z| \le P\Delta^2/\lambda$;
/// DIM otherwise.
fn select_auto(
    source: &PlanarGeometry,
    destination: &PlanarGeometry,
    wavelength: f64,
    options: &PropagationOptions,
) -> PropagationMethod {
    let dz = destination.z() - source.z();
    let pad = options
        .asm_pad_factor
        .resolve(source.shape(), source.spacing(), wavelength, dz);
    let fits = padded_geometry(source, pad, destination.z())
        .and_then(|natural| Resampler::new(&natural, destination, options.interpolation))
        .is_ok();
    let limit = (0..2)
        .map(|a| {
            let padded = ((1 + 2 * pad[a]) * source.shape()[a]) as f64;
            padded * source.spacing()[a].powi(2) / wavelength
        })
        .fold(f64::INFINITY, f64::min);

    if fits && dz.abs() <= limit {
        PropagationMethod::Asm
    } else {
        log::warn!(
            "AUTO propagation falling back to DIM (destination fits padded grid: {}, |dz| = {:.4e}, ASM limit = {:.4e})",
            fits,
            dz.abs(),
            limit
        );
        PropagationMethod::Dim
    }
}
