//! Direct integration method (DIM).
//!
//! The diffraction integral is evaluated as a discrete linear convolution of
//! the source samples with the sampled impulse response. The Rayleigh–Sommerfeld
//! (first kind) impulse response is
//!
//! $$ h(x, y) = \frac{\Delta z}{2\pi r^2}\left(\frac{1}{r} - ik\right) e^{ikr}\,\Delta A,
//! \qquad r = \sqrt{x^2 + y^2 + \Delta z^2}, $$
//!
//! and the Fresnel impulse response is
//!
//! $$ h(x, y) = \frac{e^{ik\Delta z}}{i\lambda\Delta z}
//! \exp\left(\frac{ik(x^2 + y^2)}{2\Delta z}\right)\Delta A. $$
//!
//! For $\Delta z < 0$ the Rayleigh–Sommerfeld kernel is replaced by the complex
//! conjugate of the forward kernel over $|\Delta z|$.
//!
//! The output is computed on an intermediate plane with the source spacing,
//! centred on the destination and wide enough to cover it; the plan resamples
//! it onto the destination grid.

use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{s, Array2, ArrayView2};
use num_complex::Complex64;
use wavefront_compute::ComputeBackend;

use crate::error::Result;
use crate::geometry::PlanarGeometry;

/// Intermediate plane: source spacing, destination centre and `z`, and enough
/// samples to span the destination.
pub(crate) fn intermediate_geometry(source: &PlanarGeometry, destination: &PlanarGeometry) -> Result<PlanarGeometry> {
    let mut shape = [0usize; 2];
    for (axis, n) in shape.iter_mut().enumerate() {
        let span = destination.length()[axis] / source.spacing()[axis];
        *n = (span - 1e-9).ceil().max(0.0) as usize + 1;
    }
    PlanarGeometry::new(
        shape,
        destination.z(),
        Some(source.spacing().into()),
        Some(destination.offset().into()),
    )
}

/// Sampled impulse response at transverse displacement `(dx, dy)`.
pub(crate) fn impulse_response(dx: f64, dy: f64, dz: f64, wavelength: f64, cell_area: f64, paraxial: bool) -> Complex64 {
    let k = 2.0 * PI / wavelength;
    if paraxial {
        let prefactor = Complex64::new(0.0, k * dz).exp() / Complex64::new(0.0, wavelength * dz);
        prefactor * Complex64::new(0.0, k * (dx * dx + dy * dy) / (2.0 * dz)).exp() * cell_area
    } else {
        let z = dz.abs();
        let r_sq = dx * dx + dy * dy + z * z;
        let r = r_sq.sqrt();
        let h = z / (2.0 * PI * r_sq) * Complex64::new(1.0 / r, -k) * Complex64::new(0.0, k * r).exp() * cell_area;
        if dz < 0.0 {
            h.conj()
        } else {
            h
        }
    }
}

/// Precomputed kernel spectrum for a linear convolution from the source grid
/// onto the intermediate grid.
pub(crate) struct ConvolutionStage {
    source_shape: [usize; 2],
    output_shape: [usize; 2],
    kernel_spectrum: Array2<Complex64>,
}

impl ConvolutionStage {
    pub(crate) fn new(
        source: &PlanarGeometry,
        intermediate: &PlanarGeometry,
        dz: f64,
        wavelength: f64,
        paraxial: bool,
        backend: &Arc<dyn ComputeBackend>,
    ) -> Result<Self> {
        let n = source.shape();
        let m = intermediate.shape();
        let spacing = source.spacing();
        let cell_area = source.cell_area();
        let len = [n[0] + m[0] - 1, n[1] + m[1] - 1];

        // Displacement x_I[m] - x_S[n] = (m - n) * spacing + shift, indexed by
        // j = m - n + (N - 1).
        let shift = [
            intermediate.axis_start(0) - source.axis_start(0),
            intermediate.axis_start(1) - source.axis_start(1),
        ];
        let displacement =
            |axis: usize, j: usize| (j as f64 - (n[axis] - 1) as f64) * spacing[axis] + shift[axis];

        let mut kernel_spectrum = backend.parallel_matrix_fill(len[0], len[1], &|j0, j1| {
            impulse_response(displacement(0, j0), displacement(1, j1), dz, wavelength, cell_area, paraxial)
        })?;
        backend.fft2(&mut kernel_spectrum)?;

        log::debug!(
            "DIM kernel: {:?} source samples onto {:?} intermediate samples ({:?} convolution)",
            n,
            m,
            len
        );

        Ok(Self {
            source_shape: n,
            output_shape: m,
            kernel_spectrum,
        })
    }

    /// Convolve one slice onto the intermediate grid.
    pub(crate) fn apply(
        &self,
        data: ArrayView2<'_, Complex64>,
        backend: &Arc<dyn ComputeBackend>,
    ) -> Result<Array2<Complex64>> {
        let [n0, n1] = self.source_shape;
        let [m0, m1] = self.output_shape;

        let mut buffer = Array2::<Complex64>::zeros(self.kernel_spectrum.dim());
        buffer.slice_mut(s![..n0, ..n1]).assign(&data);

        backend.fft2(&mut buffer)?;
        buffer *= &self.kernel_spectrum;
        backend.ifft2(&mut buffer)?;

        Ok(buffer.slice(s![n0 - 1..n0 - 1 + m0, n1 - 1..n1 - 1 + m1]).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use wavefront_compute::default_backend;

    #[test]
    fn test_intermediate_covers_destination() {
        let src = PlanarGeometry::centered(100, 0.0, 1e-6).unwrap();
        let dst = PlanarGeometry::new((23, 24), 0.1, Some(2.5e-6.into()), Some((4e-6, 0.0).into())).unwrap();
        let inter = intermediate_geometry(&src, &dst).unwrap();
        assert_eq!(inter.shape(), [56, 59]);
        assert_eq!(inter.spacing(), src.spacing());
        assert_eq!(inter.offset(), dst.offset());
        assert_eq!(inter.z(), 0.1);

        let same = intermediate_geometry(&src, &src.with_z(0.1).unwrap()).unwrap();
        assert!(same.is_same_grid(&src));
    }

    #[test]
    fn test_backward_kernel_is_conjugate() {
        let f = impulse_response(1e-5, -2e-5, 0.01, 6e-7, 1e-12, false);
        let b = impulse_response(1e-5, -2e-5, -0.01, 6e-7, 1e-12, false);
        assert_abs_diff_eq!(f.re, b.re, epsilon = 1e-20);
        assert_abs_diff_eq!(f.im, -b.im, epsilon = 1e-20);

        let f = impulse_response(1e-5, -2e-5, 0.01, 6e-7, 1e-12, true);
        let b = impulse_response(1e-5, -2e-5, -0.01, 6e-7, 1e-12, true);
        assert_abs_diff_eq!(f.re, b.re, epsilon = 1e-12 * f.norm());
        assert_abs_diff_eq!(f.im, -b.im, epsilon = 1e-12 * f.norm());
    }

    #[test]
    fn test_convolution_matches_direct_sum() {
        let backend = default_backend();
        let src = PlanarGeometry::centered((6, 5), 0.0, 2e-6).unwrap();
        let dst = PlanarGeometry::new((4, 3), 1e-3, Some(2e-6.into()), Some((3e-6, -1e-6).into())).unwrap();
        let inter = intermediate_geometry(&src, &dst).unwrap();
        let stage = ConvolutionStage::new(&src, &inter, 1e-3, 5e-7, false, &backend).unwrap();

        let data = Array2::from_shape_fn((6, 5), |(i, j)| Complex64::new(i as f64 + 1.0, j as f64 - 2.0));
        let out = stage.apply(data.view(), &backend).unwrap();
        assert_eq!(out.dim(), (4, 3));

        let (xs, ys) = (src.axis_coords(0), src.axis_coords(1));
        let (xd, yd) = (inter.axis_coords(0), inter.axis_coords(1));
        for m in 0..4 {
            for n in 0..3 {
                let mut direct = Complex64::new(0.0, 0.0);
                for i in 0..6 {
                    for j in 0..5 {
                        direct += data[[i, j]]
                            * impulse_response(xd[m] - xs[i], yd[n] - ys[j], 1e-3, 5e-7, src.cell_area(), false);
                    }
                }
                let scale = direct.norm().max(1e-30);
                assert_abs_diff_eq!(out[[m, n]].re / scale, direct.re / scale, epsilon = 1e-9);
                assert_abs_diff_eq!(out[[m, n]].im / scale, direct.im / scale, epsilon = 1e-9);
            }
        }
    }
}
