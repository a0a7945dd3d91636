use std::fmt;
use std::sync::Arc;

use ndarray::{Array, Array2, Array4, ArrayD, ArrayView2, Dimension, Ix2};
use num_complex::Complex64;
use wavefront_compute::ComputeBackend;

use super::{check_compatible, check_planar_shape, debug_field, to_complex_dyn, CoherentField, FieldBuilder, FieldKind, OpticalField, Sample};
use crate::error::{OpticsError, Result};
use crate::geometry::{Planar, PlanarGeometry};
use crate::propagation::PropagationPlan;
use crate::types::PropagationOptions;

/// Scalar complex field $\psi(x, y)$ on a planar grid.
#[derive(Clone)]
pub struct Field {
    data: Array2<Complex64>,
    wavelength: f64,
    geometry: PlanarGeometry,
    options: PropagationOptions,
    backend: Arc<dyn ComputeBackend>,
}

impl Field {
    /// Start building a field from 2D data of any supported element type.
    ///
    /// Data of any other rank is rejected by [`FieldBuilder::build`].
    pub fn builder<A: Sample, D: Dimension>(data: Array<A, D>) -> FieldBuilder<Field> {
        FieldBuilder::new(to_complex_dyn(data))
    }

    pub fn data(&self) -> &Array2<Complex64> {
        &self.data
    }

    pub fn into_data(self) -> Array2<Complex64> {
        self.data
    }

    /// Same field metadata around new data on a (possibly) new geometry.
    pub(crate) fn with_data(&self, data: Array2<Complex64>, geometry: PlanarGeometry) -> Self {
        Self {
            data,
            wavelength: self.wavelength,
            geometry,
            options: self.options,
            backend: Arc::clone(&self.backend),
        }
    }

    /// Inner product $\langle \psi | \phi \rangle = \sum \psi^* \phi \, \Delta A$.
    pub fn inner(&self, other: &Field) -> Result<Complex64> {
        check_compatible(self, other)?;
        let sum: Complex64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a.conj() * b)
            .sum();
        Ok(sum * self.geometry.cell_area())
    }

    /// Outer product $\psi(x_1, y_1)\,\phi^*(x_2, y_2)$ with shape `(H, W, H, W)`.
    pub fn outer(&self, other: &Field) -> Result<Array4<Complex64>> {
        check_compatible(self, other)?;
        let [h, w] = self.geometry.shape();
        Ok(Array4::from_shape_fn((h, w, h, w), |(i, j, k, l)| {
            self.data[[i, j]] * other.data[[k, l]].conj()
        }))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_field(self, f)
    }
}

impl Planar for Field {
    fn geometry(&self) -> &PlanarGeometry {
        &self.geometry
    }
}

impl OpticalField for Field {
    const KIND: FieldKind = FieldKind::Scalar;

    fn planar_shape(data: &ArrayD<Complex64>) -> Result<[usize; 2]> {
        match data.shape() {
            [h, w] => Ok([*h, *w]),
            shape => Err(OpticsError::Dimension(format!(
                "Field data must be 2D, got shape {shape:?}"
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
        let data = data
            .into_dimensionality::<Ix2>()
            .map_err(|e| OpticsError::Dimension(e.to_string()))?;
        check_planar_shape(&geometry, data.dim())?;
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
        self.data.mapv(|v| v.norm_sqr())
    }

    fn scale_power(&self, factor: f64) -> Self {
        let scale = factor.sqrt();
        self.with_data(self.data.mapv(|v| v * scale), self.geometry)
    }

    fn modulate(&self, profile: ArrayView2<'_, Complex64>) -> Result<Self> {
        check_planar_shape(&self.geometry, profile.dim())?;
        Ok(self.with_data(&self.data * &profile, self.geometry))
    }

    fn apply_plan(&self, plan: &PropagationPlan) -> Result<Self> {
        let data = plan.apply(self.data.view())?;
        Ok(self.with_data(data, *plan.destination()))
    }
}

impl CoherentField for Field {
    fn scale_amplitude(&self, c: Complex64) -> Self {
        self.with_data(self.data.mapv(|v| v * c), self.geometry)
    }

    fn combine(&self, a: Complex64, other: &Self, b: Complex64) -> Result<Self> {
        check_compatible(self, other)?;
        let data = self.data.mapv(|v| v * a) + other.data.mapv(|v| v * b);
        Ok(self.with_data(data, self.geometry))
    }
}
