//! Detectors: map a field to plain arrays of measured power.

use ndarray::{Array, Array1, Array2, Array3, Axis, Dimension, Ix3, ShapeError};
use num_complex::Complex64;

use super::{expect_rank, Element};
use crate::error::{OpticsError, Result};
use crate::fields::{Field, OpticalField, Sample};
use crate::geometry::{Planar, PlanarGeometry};
use crate::types::Vector2;

/// Power collected by each grid cell, $P_{ij} = I_{ij}\,\Delta A$.
#[derive(Debug, Clone)]
pub struct Detector {
    geometry: PlanarGeometry,
}

impl Detector {
    pub fn new(geometry: PlanarGeometry) -> Self {
        Self { geometry }
    }

    pub fn forward<F: OpticalField>(&self, field: &F) -> Result<Array2<f64>> {
        self.validate_field_geometry(field)?;
        Ok(field.intensity() * self.geometry.cell_area())
    }
}

/// Weighted power per channel,
/// $P_c = \sum_{ij} w_{c,ij}\, I_{ij}\, \Delta A$.
#[derive(Debug, Clone)]
pub struct IntensityDetector {
    weight: Array3<f64>,
    geometry: PlanarGeometry,
}

impl IntensityDetector {
    /// # Arguments
    /// * `weight` - Channel weights of shape `(C, H, W)`.
    /// * `z` - Plane of the detector.
    /// * `spacing` - Sample spacing; `None` uses the configured default.
    /// * `offset` - Grid centre; `None` means on axis.
    pub fn new<D: Dimension>(
        weight: Array<f64, D>,
        z: f64,
        spacing: Option<Vector2>,
        offset: Option<Vector2>,
    ) -> Result<Self> {
        let weight = expect_rank::<_, _, Ix3>("weight", weight)?;
        let (_, h, w) = weight.dim();
        let geometry = PlanarGeometry::new((h, w), z, spacing, offset)?;
        Ok(Self { weight, geometry })
    }

    pub fn weight(&self) -> &Array3<f64> {
        &self.weight
    }

    pub fn channels(&self) -> usize {
        self.weight.len_of(Axis(0))
    }

    pub fn forward<F: OpticalField>(&self, field: &F) -> Result<Array1<f64>> {
        self.validate_field_geometry(field)?;
        let (c, h, w) = self.weight.dim();
        let intensity = field.intensity();
        let weight = self.weight.view().into_shape_with_order((c, h * w)).map_err(dimension_error)?;
        let flat = intensity.view().into_shape_with_order(h * w).map_err(dimension_error)?;
        Ok(weight.dot(&flat) * self.geometry.cell_area())
    }
}

/// Squared modal overlap per channel,
/// $P_c = \left|\sum_{ij} w^*_{c,ij}\, \psi_{ij}\, \Delta A\right|^2$.
///
/// With an orthonormal set of modes as weights this performs a modal
/// decomposition; a field equal to one mode gives a one-hot result.
#[derive(Debug, Clone)]
pub struct FieldDetector {
    weight: Array3<Complex64>,
    geometry: PlanarGeometry,
}

impl FieldDetector {
    pub fn new<A: Sample, D: Dimension>(
        weight: Array<A, D>,
        z: f64,
        spacing: Option<Vector2>,
        offset: Option<Vector2>,
    ) -> Result<Self> {
        let weight = expect_rank::<_, _, Ix3>("weight", weight.mapv(Sample::into_complex))?;
        let (_, h, w) = weight.dim();
        let geometry = PlanarGeometry::new((h, w), z, spacing, offset)?;
        Ok(Self { weight, geometry })
    }

    pub fn weight(&self) -> &Array3<Complex64> {
        &self.weight
    }

    pub fn forward(&self, field: &Field) -> Result<Array1<f64>> {
        self.validate_field_geometry(field)?;
        let area = self.geometry.cell_area();
        Ok(self
            .weight
            .outer_iter()
            .map(|mode| {
                let overlap: Complex64 = mode.iter().zip(field.data().iter()).map(|(w, psi)| w.conj() * psi).sum();
                (overlap * area).norm_sqr()
            })
            .collect())
    }
}

fn dimension_error(e: ShapeError) -> OpticsError {
    OpticsError::Dimension(e.to_string())
}

macro_rules! impl_detector_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Planar for $ty {
                fn geometry(&self) -> &PlanarGeometry {
                    &self.geometry
                }
            }

            impl Element for $ty {}
        )*
    };
}

impl_detector_element!(Detector, IntensityDetector, FieldDetector);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::hermite_gaussian;
    use approx::assert_relative_eq;
    use ndarray::{s, Array4};

    #[test]
    fn test_detector_returns_power_per_cell() {
        let geometry = PlanarGeometry::centered((4, 5), 0.0, 0.5).unwrap();
        let field = Field::builder(Array2::<f64>::from_elem((4, 5), 2.0))
            .wavelength(1e-6)
            .spacing(0.5)
            .build()
            .unwrap();
        let power = Detector::new(geometry).forward(&field).unwrap();
        assert!(power.iter().all(|&p| p == 1.0));
    }

    #[test]
    fn test_intensity_detector_channels() {
        let mut weight = Array3::<f64>::zeros((2, 100, 100));
        weight.slice_mut(s![0, ..50, ..60]).fill(1.0);
        weight.slice_mut(s![1, ..40, ..30]).fill(1.0);
        let detector = IntensityDetector::new(weight, 0.0, Some(1.0.into()), None).unwrap();
        assert_eq!(detector.channels(), 2);
        let field = Field::builder(Array2::<f64>::ones((100, 100)))
            .wavelength(1e-6)
            .spacing(1.0)
            .build()
            .unwrap();
        let out = detector.forward(&field).unwrap();
        assert_eq!(out.to_vec(), vec![3000.0, 1200.0]);
    }

    #[test]
    fn test_weight_rank_is_validated() {
        let err = IntensityDetector::new(Array2::<f64>::ones((4, 4)), 0.0, Some(1.0.into()), None).unwrap_err();
        assert!(matches!(err, OpticsError::Dimension(_)));
        assert!(err.to_string().contains("Expected weight to be 3D, got 2D"));
        let err = FieldDetector::new(Array4::<f64>::ones((1, 1, 4, 4)), 0.0, Some(1.0.into()), None);
        assert!(matches!(err, Err(OpticsError::Dimension(_))));
    }

    #[test]
    fn test_field_detector_is_one_hot_on_modes() {
        let geometry = PlanarGeometry::centered((100, 120), 0.0, 1e-5).unwrap();
        let waist = 1e-4;
        let mut weight = Array3::<f64>::zeros((3, 100, 120));
        for (c, (m, n)) in [(0, 0), (1, 0), (0, 1)].into_iter().enumerate() {
            weight.index_axis_mut(Axis(0), c).assign(&hermite_gaussian(&geometry, m, n, waist).unwrap());
        }
        let detector = FieldDetector::new(weight, 0.0, Some(1e-5.into()), None).unwrap();
        let field = Field::builder(hermite_gaussian(&geometry, 0, 1, waist).unwrap())
            .wavelength(700e-9)
            .spacing(1e-5)
            .build()
            .unwrap();
        let out = detector.forward(&field).unwrap();
        eprintln!("modal powers: {out}");
        assert_relative_eq!(out[0], 0.0, epsilon = 1e-4);
        assert_relative_eq!(out[1], 0.0, epsilon = 1e-4);
        assert_relative_eq!(out[2], 1.0, epsilon = 1e-4);
    }
}
