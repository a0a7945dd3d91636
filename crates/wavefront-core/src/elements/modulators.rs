use ndarray::{Array, Array2, Array4, ArrayView2, ArrayView4, Dimension, Ix2, Ix4};
use num_complex::Complex64;

use super::{expect_jones_shape, expect_rank, Element, ModulationElement, PolarizedModulationElement};
use crate::error::Result;
use crate::fields::Sample;
use crate::geometry::{Planar, PlanarGeometry};
use crate::types::Vector2;

fn planar_profile(name: &str, data: Array<Complex64, impl Dimension>) -> Result<Array2<Complex64>> {
    expect_rank::<_, _, Ix2>(name, data)
}

fn jones_profile(name: &str, data: Array<Complex64, impl Dimension>) -> Result<(Array4<Complex64>, [usize; 2])> {
    let data = data.into_dyn();
    let planar = expect_jones_shape(name, &data)?;
    Ok((expect_rank::<_, _, Ix4>(name, data)?, planar))
}

macro_rules! impl_planar_element {
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

macro_rules! impl_modulation_profile {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ModulationElement for $ty {
                fn modulation_profile(&self) -> ArrayView2<'_, Complex64> {
                    self.profile.view()
                }
            }
        )*
    };
}

macro_rules! impl_polarized_profile {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PolarizedModulationElement for $ty {
                fn polarized_modulation_profile(&self) -> ArrayView4<'_, Complex64> {
                    self.profile.view()
                }
            }
        )*
    };
}

/// Multiplies the field by an arbitrary complex profile.
#[derive(Debug, Clone)]
pub struct Modulator {
    profile: Array2<Complex64>,
    geometry: PlanarGeometry,
}

impl Modulator {
    /// # Arguments
    /// * `profile` - 2D complex (or real) modulation profile.
    /// * `z` - Plane of the element.
    /// * `spacing` - Sample spacing; `None` uses the configured default.
    /// * `offset` - Grid centre; `None` means on axis.
    pub fn new<A: Sample, D: Dimension>(
        profile: Array<A, D>,
        z: f64,
        spacing: Option<Vector2>,
        offset: Option<Vector2>,
    ) -> Result<Self> {
        let profile = planar_profile("modulation profile", profile.mapv(Sample::into_complex))?;
        let geometry = PlanarGeometry::new(profile.dim(), z, spacing, offset)?;
        Ok(Self { profile, geometry })
    }
}

/// Pure phase mask, $m = e^{i\phi}$.
#[derive(Debug, Clone)]
pub struct PhaseModulator {
    phase: Array2<f64>,
    profile: Array2<Complex64>,
    geometry: PlanarGeometry,
}

impl PhaseModulator {
    pub fn new<D: Dimension>(
        phase: Array<f64, D>,
        z: f64,
        spacing: Option<Vector2>,
        offset: Option<Vector2>,
    ) -> Result<Self> {
        let phase = expect_rank::<_, _, Ix2>("phase profile", phase)?;
        let profile = phase.mapv(|p| Complex64::new(0.0, p).exp());
        let geometry = PlanarGeometry::new(phase.dim(), z, spacing, offset)?;
        Ok(Self {
            phase,
            profile,
            geometry,
        })
    }

    pub fn phase(&self) -> &Array2<f64> {
        &self.phase
    }
}

/// Real amplitude mask (apertures, absorbers).
#[derive(Debug, Clone)]
pub struct AmplitudeModulator {
    profile: Array2<Complex64>,
    geometry: PlanarGeometry,
}

impl AmplitudeModulator {
    pub fn new<D: Dimension>(
        amplitude: Array<f64, D>,
        z: f64,
        spacing: Option<Vector2>,
        offset: Option<Vector2>,
    ) -> Result<Self> {
        let profile = planar_profile("amplitude profile", amplitude.mapv(Sample::into_complex))?;
        let geometry = PlanarGeometry::new(profile.dim(), z, spacing, offset)?;
        Ok(Self { profile, geometry })
    }
}

/// Arbitrary spatially varying Jones matrix of shape `(3, 3, H, W)`.
#[derive(Debug, Clone)]
pub struct PolarizedModulator {
    profile: Array4<Complex64>,
    geometry: PlanarGeometry,
}

impl PolarizedModulator {
    pub fn new<A: Sample, D: Dimension>(
        profile: Array<A, D>,
        z: f64,
        spacing: Option<Vector2>,
        offset: Option<Vector2>,
    ) -> Result<Self> {
        let (profile, planar) = jones_profile("polarized modulation profile", profile.mapv(Sample::into_complex))?;
        let geometry = PlanarGeometry::new(planar, z, spacing, offset)?;
        Ok(Self { profile, geometry })
    }
}

/// Elementwise phase on each Jones matrix entry, $M_{ij} = e^{i\phi_{ij}}$.
#[derive(Debug, Clone)]
pub struct PolarizedPhaseModulator {
    profile: Array4<Complex64>,
    geometry: PlanarGeometry,
}

impl PolarizedPhaseModulator {
    pub fn new<D: Dimension>(
        phase: Array<f64, D>,
        z: f64,
        spacing: Option<Vector2>,
        offset: Option<Vector2>,
    ) -> Result<Self> {
        let (profile, planar) =
            jones_profile("polarized phase profile", phase.mapv(|p| Complex64::new(0.0, p).exp()))?;
        let geometry = PlanarGeometry::new(planar, z, spacing, offset)?;
        Ok(Self { profile, geometry })
    }
}

/// Real-valued Jones matrix field.
#[derive(Debug, Clone)]
pub struct PolarizedAmplitudeModulator {
    profile: Array4<Complex64>,
    geometry: PlanarGeometry,
}

impl PolarizedAmplitudeModulator {
    pub fn new<D: Dimension>(
        amplitude: Array<f64, D>,
        z: f64,
        spacing: Option<Vector2>,
        offset: Option<Vector2>,
    ) -> Result<Self> {
        let (profile, planar) =
            jones_profile("polarized amplitude profile", amplitude.mapv(Sample::into_complex))?;
        let geometry = PlanarGeometry::new(planar, z, spacing, offset)?;
        Ok(Self { profile, geometry })
    }
}

impl_planar_element!(
    Modulator,
    PhaseModulator,
    AmplitudeModulator,
    PolarizedModulator,
    PolarizedPhaseModulator,
    PolarizedAmplitudeModulator,
);
impl_modulation_profile!(Modulator, PhaseModulator, AmplitudeModulator);
impl_polarized_profile!(PolarizedModulator, PolarizedPhaseModulator, PolarizedAmplitudeModulator);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpticsError;
    use crate::fields::{CoherenceField, Field, OpticalField, PolarizedField};
    use approx::assert_relative_eq;
    use ndarray::{s, Array1, Array3};
    use std::f64::consts::PI;

    fn unit_field(n: usize) -> Field {
        Field::builder(Array2::<f64>::ones((n, n)))
            .wavelength(700e-9)
            .spacing(1e-5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_modulator_rejects_wrong_rank() {
        let err = Modulator::new(Array1::<f64>::ones(4), 0.0, Some(1.0.into()), None).unwrap_err();
        assert!(matches!(err, OpticsError::Dimension(_)));
        assert!(err.to_string().contains("Expected modulation profile to be 2D, got 1D"));
        let err = PolarizedModulator::new(Array3::<f64>::ones((3, 4, 4)), 0.0, Some(1.0.into()), None);
        assert!(err.is_err());
    }

    #[test]
    fn test_modulator_multiplies_field() {
        let profile = Array2::from_elem((10, 10), Complex64::new(0.0, 2.0));
        let m = Modulator::new(profile, 0.0, Some(1e-5.into()), None).unwrap();
        let out = m.forward(&unit_field(10)).unwrap();
        assert!(out.data().iter().all(|v| *v == Complex64::new(0.0, 2.0)));
        assert_relative_eq!(out.power(), 4.0 * 100.0 * 1e-10, max_relative = 1e-12);
    }

    #[test]
    fn test_phase_modulator_preserves_power() {
        let phase = Array2::from_shape_fn((16, 16), |(i, j)| (i * j) as f64 * 0.1);
        let m = PhaseModulator::new(phase, 0.0, Some(1e-5.into()), None).unwrap();
        let field = unit_field(16);
        let out = m.forward(&field).unwrap();
        assert_relative_eq!(out.power(), field.power(), max_relative = 1e-12);
        assert_relative_eq!(out.data()[[3, 4]].arg(), 1.2, epsilon = 1e-12);
        assert_relative_eq!(m.phase()[[3, 4]], 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_amplitude_modulator_on_coherence_field() {
        let mut amplitude = Array2::<f64>::zeros((6, 6));
        amplitude.slice_mut(s![..3, ..]).fill(1.0);
        let m = AmplitudeModulator::new(amplitude, 0.0, Some(1e-5.into()), None).unwrap();
        let coherence = CoherenceField::from_field(&unit_field(6)).unwrap();
        let out = m.forward(&coherence).unwrap();
        assert_relative_eq!(out.power(), coherence.power() / 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_element_plane_must_match_field() {
        let m = AmplitudeModulator::new(Array2::<f64>::ones((8, 8)), 0.1, Some(1e-5.into()), None).unwrap();
        let err = m.forward(&unit_field(8)).unwrap_err();
        assert!(matches!(err, OpticsError::GeometryMismatch { .. }));
    }

    #[test]
    fn test_polarized_phase_modulator_is_elementwise() {
        let mut phase = Array4::<f64>::zeros((3, 3, 4, 4));
        phase.slice_mut(s![0, 0, .., ..]).fill(PI / 2.0);
        let m = PolarizedPhaseModulator::new(phase, 0.0, Some(1.0.into()), None).unwrap();
        let profile = m.polarized_modulation_profile();
        assert_relative_eq!(profile[[0, 0, 1, 1]].im, 1.0, epsilon = 1e-12);
        assert_relative_eq!(profile[[1, 2, 1, 1]].re, 1.0, epsilon = 1e-12);

        let mut data = Array3::<f64>::zeros((3, 4, 4));
        data.slice_mut(s![0, .., ..]).fill(1.0);
        let field = PolarizedField::builder(data).wavelength(1e-6).spacing(1.0).build().unwrap();
        let out = m.forward(&field).unwrap();
        // Every output component picks up M_{i0} E_x.
        assert_relative_eq!(out.data()[[0, 2, 2]].im, 1.0, epsilon = 1e-12);
        assert_relative_eq!(out.data()[[1, 2, 2]].re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(out.data()[[2, 2, 2]].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_polarized_amplitude_modulator_identity() {
        let mut identity = Array4::<f64>::zeros((3, 3, 5, 5));
        for i in 0..3 {
            identity.slice_mut(s![i, i, .., ..]).fill(1.0);
        }
        let m = PolarizedAmplitudeModulator::new(identity, 0.0, Some(1.0.into()), None).unwrap();
        let data = Array3::from_shape_fn((3, 5, 5), |(c, i, j)| (c + i + j) as f64);
        let field = PolarizedField::builder(data).wavelength(1e-6).spacing(1.0).build().unwrap();
        let out = m.forward(&field).unwrap();
        assert_eq!(out.data(), field.data());
    }
}
