//! Separable Fresnel and Fraunhofer transforms.
//!
//! The paraxial impulse response factorises over the two planar axes, so the
//! diffraction integral becomes a pair of dense matrix products,
//!
//! $$ U' = e^{ik\Delta z}\, \mathbf{A}_x U \mathbf{A}_y^T, \qquad
//! A_{mn} = \frac{\Delta\xi}{\sqrt{i\lambda\Delta z}}
//! \exp\left(\frac{ik(x_m - \xi_n)^2}{2\Delta z}\right), $$
//!
//! evaluated directly on the destination samples. No padding or cropping is
//! involved, so the destination may have any shape, spacing and offset.
//!
//! The two-step variant chains two single-step transforms through an
//! intermediate plane at $z_1 = \Delta z / (1 + m)$, where $m$ is the ratio of
//! destination to source spacing. The Fraunhofer transform drops the source
//! chirp, $A_{mn} = e^{ikx_m^2/2\Delta z} e^{-i2\pi x_m\xi_n/\lambda\Delta z}
//! \Delta\xi / \sqrt{i\lambda\Delta z}$, and is not time-reversible.

use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView2};
use num_complex::Complex64;
use wavefront_compute::ComputeBackend;

use crate::error::Result;
use crate::geometry::PlanarGeometry;

/// Which separable kernel to assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeparableKind {
    OneStep,
    TwoStep,
    Fraunhofer,
}

/// Sample positions and spacing of one planar axis.
struct AxisGrid {
    coords: Array1<f64>,
    spacing: f64,
}

impl AxisGrid {
    fn of(geometry: &PlanarGeometry, axis: usize) -> Self {
        Self {
            coords: geometry.axis_coords(axis),
            spacing: geometry.spacing()[axis],
        }
    }

    fn uniform(n: usize, spacing: f64, offset: f64) -> Self {
        let centre = (n as f64 - 1.0) / 2.0;
        Self {
            coords: Array1::from_shape_fn(n, |i| (i as f64 - centre) * spacing + offset),
            spacing,
        }
    }
}

/// Per-axis normalisation $1 / \sqrt{i\lambda z}$.
fn axis_normalisation(wavelength: f64, dz: f64) -> Complex64 {
    Complex64::new(0.0, wavelength * dz).sqrt().inv()
}

fn fresnel_matrix(
    dst: &AxisGrid,
    src: &AxisGrid,
    dz: f64,
    wavelength: f64,
    backend: &Arc<dyn ComputeBackend>,
) -> Result<Array2<Complex64>> {
    let k = 2.0 * PI / wavelength;
    let scale = axis_normalisation(wavelength, dz) * src.spacing;
    let matrix = backend.parallel_matrix_fill(dst.coords.len(), src.coords.len(), &|m, n| {
        let d = dst.coords[m] - src.coords[n];
        scale * Complex64::new(0.0, k * d * d / (2.0 * dz)).exp()
    })?;
    Ok(matrix)
}

fn fraunhofer_matrix(
    dst: &AxisGrid,
    src: &AxisGrid,
    dz: f64,
    wavelength: f64,
    backend: &Arc<dyn ComputeBackend>,
) -> Result<Array2<Complex64>> {
    let k = 2.0 * PI / wavelength;
    let scale = axis_normalisation(wavelength, dz) * src.spacing;
    let matrix = backend.parallel_matrix_fill(dst.coords.len(), src.coords.len(), &|m, n| {
        let x = dst.coords[m];
        let xi = src.coords[n];
        let phase = k * x * x / (2.0 * dz) - 2.0 * PI * x * xi / (wavelength * dz);
        scale * Complex64::new(0.0, phase).exp()
    })?;
    Ok(matrix)
}

/// Composite matrix of the two-step transform along one axis.
fn two_step_matrix(
    source: &PlanarGeometry,
    destination: &PlanarGeometry,
    axis: usize,
    dz: f64,
    wavelength: f64,
    backend: &Arc<dyn ComputeBackend>,
) -> Result<Array2<Complex64>> {
    let (ds, dd) = (source.spacing()[axis], destination.spacing()[axis]);
    let (os, od) = (source.offset()[axis], destination.offset()[axis]);
    let ratio = dd / ds;
    let z1 = dz / (1.0 + ratio);
    let z2 = dz - z1;
    let t = z1 / dz;

    let n1 = source.shape()[axis].max(destination.shape()[axis]);
    let intermediate = AxisGrid::uniform(n1, ds + (dd - ds) * t, os + (od - os) * t);

    let first = fresnel_matrix(&intermediate, &AxisGrid::of(source, axis), z1, wavelength, backend)?;
    let second = fresnel_matrix(&AxisGrid::of(destination, axis), &intermediate, z2, wavelength, backend)?;
    Ok(backend.matmul(second.view(), first.view())?)
}

/// Precomputed separable transform between two planes.
pub(crate) struct SeparableStage {
    ax: Array2<Complex64>,
    ay_t: Array2<Complex64>,
    phase: Complex64,
}

impl SeparableStage {
    pub(crate) fn new(
        source: &PlanarGeometry,
        destination: &PlanarGeometry,
        dz: f64,
        wavelength: f64,
        kind: SeparableKind,
        backend: &Arc<dyn ComputeBackend>,
    ) -> Result<Self> {
        let axis_matrix = |axis: usize| -> Result<Array2<Complex64>> {
            let (dst, src) = (AxisGrid::of(destination, axis), AxisGrid::of(source, axis));
            match kind {
                SeparableKind::OneStep => fresnel_matrix(&dst, &src, dz, wavelength, backend),
                SeparableKind::Fraunhofer => fraunhofer_matrix(&dst, &src, dz, wavelength, backend),
                SeparableKind::TwoStep => two_step_matrix(source, destination, axis, dz, wavelength, backend),
            }
        };
        let ax = axis_matrix(0)?;
        let ay_t = axis_matrix(1)?.reversed_axes();
        let phase = Complex64::new(0.0, 2.0 * PI / wavelength * dz).exp();

        log::debug!("{:?} separable transform: x {:?}, y^T {:?}", kind, ax.dim(), ay_t.dim());

        Ok(Self { ax, ay_t, phase })
    }

    pub(crate) fn apply(
        &self,
        data: ArrayView2<'_, Complex64>,
        backend: &Arc<dyn ComputeBackend>,
    ) -> Result<Array2<Complex64>> {
        let rows = backend.matmul(self.ax.view(), data)?;
        let mut out = backend.matmul(rows.view(), self.ay_t.view())?;
        out.mapv_inplace(|v| v * self.phase);
        Ok(out)
    }
}
