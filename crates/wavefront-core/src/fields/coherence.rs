use std::fmt;
use std::sync::Arc;

use ndarray::{s, Array, Array2, Array4, ArrayD, ArrayView2, Dimension, Ix4};
use num_complex::Complex64;
use wavefront_compute::ComputeBackend;

use super::{check_planar_shape, debug_field, to_complex_dyn, Field, FieldBuilder, FieldKind, OpticalField, Sample};
use crate::error::{OpticsError, Result};
use crate::geometry::{Planar, PlanarGeometry};
use crate::propagation::PropagationPlan;
use crate::types::PropagationOptions;

/// Mutual coherence function $\Gamma(x_1, y_1, x_2, y_2)$ of a partially
/// coherent field, stored as `(H, W, H, W)`.
///
/// The intensity is the diagonal, $I(x, y) = \mathrm{Re}\,\Gamma(x, y, x, y)$.
/// A fully coherent field $\psi$ corresponds to
/// $\Gamma = \psi(x_1, y_1)\psi^*(x_2, y_2)$; modulation, propagation and
/// normalisation preserve that correspondence.
#[derive(Clone)]
pub struct CoherenceField {
    data: Array4<Complex64>,
    wavelength: f64,
    geometry: PlanarGeometry,
    options: PropagationOptions,
    backend: Arc<dyn ComputeBackend>,
}

impl CoherenceField {
    /// Start building a coherence field from `(H, W, H, W)` data.
    pub fn builder<A: Sample, D: Dimension>(data: Array<A, D>) -> FieldBuilder<CoherenceField> {
        FieldBuilder::new(to_complex_dyn(data))
    }

    /// Coherence function of a fully coherent scalar field, sharing its
    /// wavelength, geometry, options and backend.
    pub fn from_field(field: &Field) -> Result<Self> {
        Ok(Self {
            data: field.outer(field)?,
            wavelength: field.wavelength(),
            geometry: *field.geometry(),
            options: *field.options(),
            backend: Arc::clone(field.backend()),
        })
    }

    pub fn data(&self) -> &Array4<Complex64> {
        &self.data
    }

    pub fn into_data(self) -> Array4<Complex64> {
        self.data
    }

    fn with_data(&self, data: Array4<Complex64>, geometry: PlanarGeometry) -> Self {
        Self {
            data,
            wavelength: self.wavelength,
            geometry,
            options: self.options,
            backend: Arc::clone(&self.backend),
        }
    }
}

impl fmt::Debug for CoherenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_field(self, f)
    }
}

impl Planar for CoherenceField {
    fn geometry(&self) -> &PlanarGeometry {
        &self.geometry
    }
}

impl OpticalField for CoherenceField {
    const KIND: FieldKind = FieldKind::Coherence;

    fn planar_shape(data: &ArrayD<Complex64>) -> Result<[usize; 2]> {
        match data.shape() {
            [h1, w1, h2, w2] if h1 == h2 && w1 == w2 => Ok([*h1, *w1]),
            shape => Err(OpticsError::Dimension(format!(
                "CoherenceField data must have shape (H, W, H, W), got {shape:?}"
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
        let [h, w] = Self::planar_shape(&data)?;
        check_planar_shape(&geometry, (h, w))?;
        let data = data
            .into_dimensionality::<Ix4>()
            .map_err(|e| OpticsError::Dimension(e.to_string()))?;
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
        let [h, w] = self.geometry.shape();
        Array2::from_shape_fn((h, w), |(i, j)| self.data[[i, j, i, j]].re)
    }

    fn scale_power(&self, factor: f64) -> Self {
        self.with_data(self.data.mapv(|v| v * factor), self.geometry)
    }

    /// $\Gamma' = m(x_1, y_1)\,\Gamma\,m^*(x_2, y_2)$.
    fn modulate(&self, profile: ArrayView2<'_, Complex64>) -> Result<Self> {
        check_planar_shape(&self.geometry, profile.dim())?;
        let [h, w] = self.geometry.shape();
        let data = Array4::from_shape_fn((h, w, h, w), |(i, j, k, l)| {
            profile[[i, j]] * self.data[[i, j, k, l]] * profile[[k, l]].conj()
        });
        Ok(self.with_data(data, self.geometry))
    }

    /// Propagate the first coordinate pair with the plan and the second with
    /// its conjugate, $\Gamma' = P\,\Gamma\,P^\dagger$.
    fn apply_plan(&self, plan: &PropagationPlan) -> Result<Self> {
        let [h, w] = self.geometry.shape();
        let [hd, wd] = plan.destination().shape();

        let mut first = Array4::<Complex64>::zeros((hd, wd, h, w));
        for k in 0..h {
            for l in 0..w {
                let out = plan.apply(self.data.slice(s![.., .., k, l]))?;
                first.slice_mut(s![.., .., k, l]).assign(&out);
            }
        }

        let mut data = Array4::<Complex64>::zeros((hd, wd, hd, wd));
        for i in 0..hd {
            for j in 0..wd {
                let out = plan.apply_conjugate(first.slice(s![i, j, .., ..]))?;
                data.slice_mut(s![i, j, .., ..]).assign(&out);
            }
        }

        Ok(self.with_data(data, *plan.destination()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shape_validation() {
        let ok = CoherenceField::builder(Array4::<f64>::ones((3, 4, 3, 4))).wavelength(1.0).spacing(1.0).build();
        assert!(ok.is_ok());
        let bad = CoherenceField::builder(Array4::<f64>::ones((3, 4, 4, 3))).wavelength(1.0).spacing(1.0).build();
        assert!(matches!(bad, Err(OpticsError::Dimension(_))));
        let flat = CoherenceField::builder(Array2::<f64>::ones((3, 4))).wavelength(1.0).spacing(1.0).build();
        assert!(flat.is_err());
    }

    #[test]
    fn test_coherent_intensity_matches_field() {
        let data = Array2::from_shape_fn((4, 5), |(i, j)| Complex64::new(i as f64, 1.0 - j as f64));
        let field = Field::builder(data).wavelength(1.0).spacing(0.5).build().unwrap();
        let coherence = CoherenceField::from_field(&field).unwrap();
        for (a, b) in coherence.intensity().iter().zip(field.intensity().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
        let normalized = coherence.normalize(2.5).unwrap();
        assert_relative_eq!(normalized.power(), 2.5, epsilon = 1e-12);
    }
}
