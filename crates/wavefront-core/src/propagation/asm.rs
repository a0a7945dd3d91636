//! Angular spectrum method (ASM).
//!
//! The field is zero-padded, transformed to spatial frequencies, multiplied
//! by the free-space transfer function and transformed back:
//!
//! $$ H(f_x, f_y) = \exp\left(i 2\pi \Delta z \sqrt{\lambda^{-2} - f_x^2 - f_y^2}\right) $$
//!
//! or, in the paraxial variant,
//!
//! $$ H(f_x, f_y) = e^{ik\Delta z} \exp\left(-i\pi\lambda\Delta z (f_x^2 + f_y^2)\right). $$
//!
//! Evanescent components are discarded and the transfer function is band
//! limited (Matsushima & Shimobaba, 2009) to
//! $|f| \le 1 / (\lambda \sqrt{(2\Delta f \Delta z)^2 + 1})$ with
//! $\Delta f = 1 / (P \Delta)$ so that the sampled chirp does not alias.
//!
//! The result lives on the padded ("natural") grid: padded shape, source
//! spacing and source offset. Resampling onto the destination happens in the
//! plan.

use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{s, Array2, ArrayView2};
use num_complex::Complex64;
use wavefront_compute::ComputeBackend;

use crate::error::Result;
use crate::geometry::PlanarGeometry;

/// Grid of the padded field: `(1 + 2p) N` samples per axis, sharing the
/// source spacing and centre, placed at plane `z`.
pub(crate) fn padded_geometry(source: &PlanarGeometry, pad: [usize; 2], z: f64) -> Result<PlanarGeometry> {
    let shape = source.shape();
    PlanarGeometry::new(
        [(1 + 2 * pad[0]) * shape[0], (1 + 2 * pad[1]) * shape[1]],
        z,
        Some(source.spacing().into()),
        Some(source.offset().into()),
    )
}

/// Sample frequency of FFT bin `u` for an `n`-point transform with sample
/// spacing `d`, in the same order as the transform output.
pub(crate) fn fft_frequency(u: usize, n: usize, d: f64) -> f64 {
    let signed = if u < n.div_ceil(2) { u as f64 } else { u as f64 - n as f64 };
    signed / (n as f64 * d)
}

/// Precomputed transfer function for one source geometry and distance.
pub(crate) struct SpectralStage {
    pad: [usize; 2],
    source_shape: [usize; 2],
    transfer: Array2<Complex64>,
}

impl SpectralStage {
    pub(crate) fn new(
        source: &PlanarGeometry,
        dz: f64,
        wavelength: f64,
        pad: [usize; 2],
        paraxial: bool,
        backend: &Arc<dyn ComputeBackend>,
    ) -> Result<Self> {
        let shape = source.shape();
        let spacing = source.spacing();
        let padded = [(1 + 2 * pad[0]) * shape[0], (1 + 2 * pad[1]) * shape[1]];

        let band_limit = |axis: usize| {
            let df = 1.0 / (padded[axis] as f64 * spacing[axis]);
            1.0 / (wavelength * ((2.0 * df * dz).powi(2) + 1.0).sqrt())
        };
        let (limit_x, limit_y) = (band_limit(0), band_limit(1));
        let k = 2.0 * PI / wavelength;
        let inv_lambda_sq = 1.0 / (wavelength * wavelength);
        let carrier = Complex64::new(0.0, k * dz).exp();

        let transfer = backend.parallel_matrix_fill(padded[0], padded[1], &|u, v| {
            let fx = fft_frequency(u, padded[0], spacing[0]);
            let fy = fft_frequency(v, padded[1], spacing[1]);
            if fx.abs() > limit_x || fy.abs() > limit_y {
                return Complex64::new(0.0, 0.0);
            }
            let f_sq = fx * fx + fy * fy;
            if paraxial {
                carrier * Complex64::new(0.0, -PI * wavelength * dz * f_sq).exp()
            } else {
                let arg = inv_lambda_sq - f_sq;
                if arg < 0.0 {
                    Complex64::new(0.0, 0.0)
                } else {
                    Complex64::new(0.0, 2.0 * PI * dz * arg.sqrt()).exp()
                }
            }
        })?;

        log::debug!(
            "ASM transfer function: padded grid {:?}, band limit ({:.3e}, {:.3e}) 1/m",
            padded,
            limit_x,
            limit_y
        );

        Ok(Self {
            pad,
            source_shape: shape,
            transfer,
        })
    }

    /// Propagate one slice onto the padded grid.
    pub(crate) fn apply(
        &self,
        data: ArrayView2<'_, Complex64>,
        backend: &Arc<dyn ComputeBackend>,
    ) -> Result<Array2<Complex64>> {
        let [n0, n1] = self.source_shape;
        let (p0, p1) = (self.pad[0] * n0, self.pad[1] * n1);

        let mut buffer = Array2::<Complex64>::zeros(self.transfer.dim());
        buffer.slice_mut(s![p0..p0 + n0, p1..p1 + n1]).assign(&data);

        backend.fft2(&mut buffer)?;
        buffer *= &self.transfer;
        backend.ifft2(&mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use wavefront_compute::default_backend;

    #[test]
    fn test_fft_frequency_ordering() {
        let even: Vec<f64> = (0..4).map(|u| fft_frequency(u, 4, 0.5)).collect();
        assert_eq!(even, vec![0.0, 0.5, -1.0, -0.5]);
        let odd: Vec<f64> = (0..5).map(|u| fft_frequency(u, 5, 1.0)).collect();
        assert_eq!(odd, vec![0.0, 0.2, 0.4, -0.4, -0.2]);
    }

    #[test]
    fn test_padded_geometry_is_centred_on_source() {
        let src = PlanarGeometry::new((10, 20), 0.0, Some(1e-6.into()), Some((3e-6, -1e-6).into())).unwrap();
        let padded = padded_geometry(&src, [3, 2], 0.5).unwrap();
        assert_eq!(padded.shape(), [70, 100]);
        assert_eq!(padded.z(), 0.5);
        // The source samples sit at indices [pN, pN + N) of the padded grid.
        let xs = src.axis_coords(0);
        let xp = padded.axis_coords(0);
        assert_abs_diff_eq!(xp[30], xs[0], epsilon = 1e-18);
        assert_abs_diff_eq!(xp[39], xs[9], epsilon = 1e-18);
    }

    #[test]
    fn test_plane_wave_only_acquires_phase() {
        let backend = default_backend();
        let src = PlanarGeometry::centered(16, 0.0, 1e-6).unwrap();
        let stage = SpectralStage::new(&src, 1e-3, 5e-7, [0, 0], false, &backend).unwrap();
        let ones = Array2::from_elem((16, 16), Complex64::new(1.0, 0.0));
        let out = stage.apply(ones.view(), &backend).unwrap();
        let expected = Complex64::new(0.0, 2.0 * PI * 1e-3 / 5e-7).exp();
        for v in out.iter() {
            assert_abs_diff_eq!(v.re, expected.re, epsilon = 1e-9);
            assert_abs_diff_eq!(v.im, expected.im, epsilon = 1e-9);
        }
    }
}
