use std::fmt;
use std::sync::Arc;

use ndarray::{s, Array, Array2, Array3, Array6, ArrayD, ArrayView2, ArrayView4, Axis, Dimension, Ix3, Zip};
use num_complex::Complex64;
use wavefront_compute::ComputeBackend;

use super::{check_compatible, check_planar_shape, debug_field, to_complex_dyn, CoherentField, FieldBuilder, FieldKind, OpticalField, Sample};
use crate::error::{OpticsError, Result};
use crate::geometry::{Planar, PlanarGeometry};
use crate::propagation::PropagationPlan;
use crate::types::PropagationOptions;

/// Vector field $(E_x, E_y, E_z)$ on a planar grid, stored as `(3, H, W)`.
///
/// Each component propagates independently; intensity and power sum over the
/// three components.
#[derive(Clone)]
pub struct PolarizedField {
    data: Array3<Complex64>,
    wavelength: f64,
    geometry: PlanarGeometry,
    options: PropagationOptions,
    backend: Arc<dyn ComputeBackend>,
}

impl PolarizedField {
    /// Start building a polarized field from `(3, H, W)` data.
    pub fn builder<A: Sample, D: Dimension>(data: Array<A, D>) -> FieldBuilder<PolarizedField> {
        FieldBuilder::new(to_complex_dyn(data))
    }

    pub fn data(&self) -> &Array3<Complex64> {
        &self.data
    }

    pub fn into_data(self) -> Array3<Complex64> {
        self.data
    }

    /// One polarization component: 0 = x, 1 = y, 2 = z.
    pub fn component(&self, index: usize) -> ArrayView2<'_, Complex64> {
        self.data.index_axis(Axis(0), index)
    }

    pub(crate) fn with_data(&self, data: Array3<Complex64>, geometry: PlanarGeometry) -> Self {
        Self {
            data,
            wavelength: self.wavelength,
            geometry,
            options: self.options,
            backend: Arc::clone(&self.backend),
        }
    }

    /// Apply a spatially varying Jones matrix, $E'_i = \sum_j M_{ij} E_j$.
    ///
    /// `matrix` has shape `(3, 3, H, W)`.
    pub fn polarized_modulate(&self, matrix: ArrayView4<'_, Complex64>) -> Result<Self> {
        let [h, w] = self.geometry.shape();
        if matrix.shape() != [3, 3, h, w] {
            return Err(OpticsError::ShapeMismatch {
                left: matrix.shape().to_vec(),
                right: vec![3, 3, h, w],
            });
        }
        let mut out = Array3::<Complex64>::zeros((3, h, w));
        for i in 0..3 {
            let mut target = out.index_axis_mut(Axis(0), i);
            for j in 0..3 {
                Zip::from(&mut target)
                    .and(matrix.slice(s![i, j, .., ..]))
                    .and(self.data.index_axis(Axis(0), j))
                    .for_each(|t, &m, &e| *t += m * e);
            }
        }
        Ok(self.with_data(out, self.geometry))
    }

    /// Inner product summed over components, $\sum_c \sum E^*_c F_c \, \Delta A$.
    pub fn inner(&self, other: &PolarizedField) -> Result<Complex64> {
        check_compatible(self, other)?;
        let sum: Complex64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a.conj() * b)
            .sum();
        Ok(sum * self.geometry.cell_area())
    }

    /// Outer product over component and grid axes, shape `(3, H, W, 3, H, W)`.
    pub fn outer(&self, other: &PolarizedField) -> Result<Array6<Complex64>> {
        check_compatible(self, other)?;
        let [h, w] = self.geometry.shape();
        Ok(Array6::from_shape_fn((3, h, w, 3, h, w), |(c1, i, j, c2, k, l)| {
            self.data[[c1, i, j]] * other.data[[c2, k, l]].conj()
        }))
    }
}

impl fmt::Debug for PolarizedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_field(self, f)
    }
}

impl Planar for PolarizedField {
    fn geometry(&self) -> &PlanarGeometry {
        &self.geometry
    }
}

impl OpticalField for PolarizedField {
    const KIND: FieldKind = FieldKind::Polarized;

    fn planar_shape(data: &ArrayD<Complex64>) -> Result<[usize; 2]> {
        match data.shape() {
            [3, h, w] => Ok([*h, *w]),
            shape => Err(OpticsError::Dimension(format!(
                "PolarizedField data must have shape (3, H, W), got {shape:?}"
            ))),
        }
    }

    fn from_parts(
        data: ArrayD<Complex64>,
        wavelength: f64,
        geometry: PlanarGeometry,
        options: PropagationOptions,
        backend: Arc<dyn ComputeBackend>,
    ) -> Result<Self> {
        Self::planar_shape(&data)?;
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|e| OpticsError::Dimension(e.to_string()))?;
        let (_, h, w) = data.dim();
        check_planar_shape(&geometry, (h, w))?;
        Ok(Self {
            data,
            wavelength,
            geometry,
            options,
            backend,
        })
    }

    fn wavelength(&self) -> f64 {
        self.wavelength
    }

    fn options(&self) -> &PropagationOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut PropagationOptions {
        &mut self.options
    }

    fn backend(&self) -> &Arc<dyn ComputeBackend> {
        &self.backend
    }

    fn intensity(&self) -> Array2<f64> {
        self.data.map(|v| v.norm_sqr()).sum_axis(Axis(0))
    }

    fn scale_power(&self, factor: f64) -> Self {
        let scale = factor.sqrt();
        self.with_data(self.data.mapv(|v| v * scale), self.geometry)
    }

    fn modulate(&self, profile: ArrayView2<'_, Complex64>) -> Result<Self> {
        check_planar_shape(&self.geometry, profile.dim())?;
        let mut data = self.data.clone();
        for mut component in data.axis_iter_mut(Axis(0)) {
            component *= &profile;
        }
        Ok(self.with_data(data, self.geometry))
    }

    fn apply_plan(&self, plan: &PropagationPlan) -> Result<Self> {
        let [h, w] = plan.destination().shape();
        let mut data = Array3::<Complex64>::zeros((3, h, w));
        for (c, mut target) in data.axis_iter_mut(Axis(0)).enumerate() {
            target.assign(&plan.apply(self.component(c))?);
        }
        Ok(self.with_data(data, *plan.destination()))
    }
}

impl CoherentField for PolarizedField {
    fn scale_amplitude(&self, c: Complex64) -> Self {
        self.with_data(self.data.mapv(|v| v * c), self.geometry)
    }

    fn combine(&self, a: Complex64, other: &Self, b: Complex64) -> Result<Self> {
        check_compatible(self, other)?;
        let data = self.data.mapv(|v| v * a) + other.data.mapv(|v| v * b);
        Ok(self.with_data(data, self.geometry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array4;

    fn polarized(ex: f64, ey: f64, ez: f64) -> PolarizedField {
        let mut data = Array3::<Complex64>::zeros((3, 5, 6));
        data.index_axis_mut(Axis(0), 0).fill(Complex64::new(ex, 0.0));
        data.index_axis_mut(Axis(0), 1).fill(Complex64::new(ey, 0.0));
        data.index_axis_mut(Axis(0), 2).fill(Complex64::new(ez, 0.0));
        PolarizedField::builder(data).wavelength(1.0).spacing(1.0).build().unwrap()
    }

    #[test]
    fn test_leading_axis_must_be_three() {
        let bad = PolarizedField::builder(Array3::<f64>::ones((2, 5, 5))).wavelength(1.0).spacing(1.0).build();
        assert!(matches!(bad, Err(OpticsError::Dimension(_))));
        let flat = PolarizedField::builder(Array2::<f64>::ones((5, 5))).wavelength(1.0).spacing(1.0).build();
        assert!(flat.is_err());
    }

    #[test]
    fn test_intensity_sums_components() {
        let f = polarized(1.0, 2.0, 3.0);
        assert!(f.intensity().iter().all(|&v| v == 14.0));
        assert_relative_eq!(f.power(), 14.0 * 30.0);
        assert_relative_eq!(f.inner(&f).unwrap().re, 14.0 * 30.0);
        assert_eq!(f.outer(&f).unwrap().shape(), &[3, 5, 6, 3, 5, 6]);
    }

    #[test]
    fn test_polarized_modulate_swaps_components() {
        let f = polarized(1.0, 2.0, 0.0);
        let mut m = Array4::<Complex64>::zeros((3, 3, 5, 6));
        m.slice_mut(s![0, 1, .., ..]).fill(Complex64::new(1.0, 0.0));
        m.slice_mut(s![1, 0, .., ..]).fill(Complex64::new(1.0, 0.0));
        let out = f.polarized_modulate(m.view()).unwrap();
        assert_eq!(out.data()[[0, 2, 3]], Complex64::new(2.0, 0.0));
        assert_eq!(out.data()[[1, 2, 3]], Complex64::new(1.0, 0.0));
        assert_eq!(out.data()[[2, 2, 3]], Complex64::new(0.0, 0.0));

        let wrong = Array4::<Complex64>::zeros((3, 3, 5, 5));
        assert!(f.polarized_modulate(wrong.view()).is_err());
    }
}
