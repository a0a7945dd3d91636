//! Geometry-aware resampling of planar data.
//!
//! Resampling is separable: for every destination coordinate along an axis a
//! short list of `(source index, weight)` taps is computed once, and the 2D
//! result is the tensor product of the two axes,
//!
//! $$ U'_{mn} = \sum_a \sum_b w^{(0)}_{ma} w^{(1)}_{nb} U_{ab}. $$
//!
//! Bicubic weights follow Keys' convolution kernel with $a = -0.75$; taps
//! that fall off the grid are clamped to the border sample.

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use wavefront_compute::ComputeBackend;

use crate::error::{OpticsError, Result};
use crate::geometry::PlanarGeometry;
use crate::types::InterpolationMode;

/// Destination samples may lie this far (in units of the source spacing)
/// outside the source grid before resampling is rejected.
pub const BOUNDS_TOLERANCE: f64 = 1e-6;

/// Fractional indices this close to an integer are snapped onto it.
const SNAP_TOLERANCE: f64 = 1e-9;

const KEYS_A: f64 = -0.75;

type Taps = Vec<(usize, f64)>;

/// Precomputed separable resampling from one planar grid onto another.
#[derive(Debug, Clone)]
pub struct Resampler {
    source_shape: [usize; 2],
    destination_shape: [usize; 2],
    taps: [Vec<Taps>; 2],
    identity: bool,
}

impl Resampler {
    /// Build the resampling taps from `source` onto `destination`.
    ///
    /// Fails with [`OpticsError::OutOfBounds`] if any destination sample lies
    /// outside the source grid. The `z` positions of the two geometries are
    /// ignored.
    pub fn new(source: &PlanarGeometry, destination: &PlanarGeometry, mode: InterpolationMode) -> Result<Self> {
        let sb = source.bounds();
        let db = destination.bounds();
        let out_of_bounds = || OpticsError::OutOfBounds {
            destination: format!("[{:.6e}, {:.6e}] x [{:.6e}, {:.6e}]", db[0], db[1], db[2], db[3]),
            region: format!("[{:.6e}, {:.6e}] x [{:.6e}, {:.6e}]", sb[0], sb[1], sb[2], sb[3]),
        };

        let mut taps: [Vec<Taps>; 2] = [Vec::new(), Vec::new()];
        for (axis, axis_taps) in taps.iter_mut().enumerate() {
            let n = source.shape()[axis];
            let start = source.axis_start(axis);
            let step = source.spacing()[axis];
            for x in destination.axis_coords(axis).iter() {
                let mut t = (x - start) / step;
                if t < -BOUNDS_TOLERANCE || t > (n - 1) as f64 + BOUNDS_TOLERANCE {
                    return Err(out_of_bounds());
                }
                if (t - t.round()).abs() < SNAP_TOLERANCE {
                    t = t.round();
                }
                axis_taps.push(axis_taps_for(t.clamp(0.0, (n - 1) as f64), n, mode));
            }
        }

        let identity = source.shape() == destination.shape()
            && taps
                .iter()
                .all(|axis| axis.iter().enumerate().all(|(i, t)| t.len() == 1 && t[0] == (i, 1.0)));

        Ok(Self {
            source_shape: source.shape(),
            destination_shape: destination.shape(),
            taps,
            identity,
        })
    }

    /// Whether the destination samples coincide with the source samples.
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn destination_shape(&self) -> [usize; 2] {
        self.destination_shape
    }

    /// Resample one planar slice.
    pub fn apply(&self, data: ArrayView2<'_, Complex64>, backend: &Arc<dyn ComputeBackend>) -> Result<Array2<Complex64>> {
        let dim = data.dim();
        if [dim.0, dim.1] != self.source_shape {
            return Err(OpticsError::ShapeMismatch {
                left: vec![dim.0, dim.1],
                right: self.source_shape.to_vec(),
            });
        }
        if self.identity {
            return Ok(data.to_owned());
        }

        let [t0, t1] = &self.taps;
        let rows = backend.parallel_matrix_fill(self.destination_shape[0], dim.1, &|m, b| {
            t0[m].iter().map(|&(a, w)| data[[a, b]] * w).sum()
        })?;
        let out = backend.parallel_matrix_fill(self.destination_shape[0], self.destination_shape[1], &|m, n| {
            t1[n].iter().map(|&(b, w)| rows[[m, b]] * w).sum()
        })?;
        Ok(out)
    }
}

/// Resample `data` sampled on `source` onto `destination`.
pub fn resample(
    data: ArrayView2<'_, Complex64>,
    source: &PlanarGeometry,
    destination: &PlanarGeometry,
    mode: InterpolationMode,
    backend: &Arc<dyn ComputeBackend>,
) -> Result<Array2<Complex64>> {
    Resampler::new(source, destination, mode)?.apply(data, backend)
}

/// Taps for fractional index `t` (already clamped to `[0, n-1]`).
fn axis_taps_for(t: f64, n: usize, mode: InterpolationMode) -> Taps {
    if n == 1 {
        return vec![(0, 1.0)];
    }
    match mode {
        InterpolationMode::Nearest => vec![((t.round() as usize).min(n - 1), 1.0)],
        InterpolationMode::Bilinear => {
            let i0 = (t.floor() as usize).min(n - 2);
            let f = t - i0 as f64;
            if f == 0.0 {
                vec![(i0, 1.0)]
            } else if f == 1.0 {
                vec![(i0 + 1, 1.0)]
            } else {
                vec![(i0, 1.0 - f), (i0 + 1, f)]
            }
        }
        InterpolationMode::Bicubic => {
            let i0 = t.floor() as usize;
            let f = t - i0 as f64;
            if f == 0.0 {
                return vec![(i0, 1.0)];
            }
            let mut taps: Taps = Vec::with_capacity(4);
            for (k, d) in [(-1_i64, 1.0 + f), (0, f), (1, 1.0 - f), (2, 2.0 - f)] {
                let idx = (i0 as i64 + k).clamp(0, n as i64 - 1) as usize;
                let w = keys_weight(d);
                match taps.iter_mut().find(|(i, _)| *i == idx) {
                    Some(tap) => tap.1 += w,
                    None => taps.push((idx, w)),
                }
            }
            taps
        }
    }
}

/// Keys cubic convolution kernel evaluated at distance `d >= 0`.
fn keys_weight(d: f64) -> f64 {
    let d = d.abs();
    if d <= 1.0 {
        ((KEYS_A + 2.0) * d - (KEYS_A + 3.0)) * d * d + 1.0
    } else if d < 2.0 {
        ((KEYS_A * d - 5.0 * KEYS_A) * d + 8.0 * KEYS_A) * d - 4.0 * KEYS_A
    } else {
        0.0
    }
}
