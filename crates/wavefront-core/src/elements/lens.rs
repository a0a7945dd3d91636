use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;

use super::{Element, ModulationElement};
use crate::error::{validate_wavelength, Result};
use crate::geometry::{Planar, PlanarGeometry};
use crate::profiles::{circle, lens_phase};

/// Thin lens of focal length $f$ designed for wavelength $\lambda$.
///
/// The modulation profile is $\exp(-i\pi r^2/\lambda f)$, optionally clipped
/// to a circular pupil whose diameter is the smaller physical side of the
/// grid.
#[derive(Debug, Clone)]
pub struct Lens {
    focal_length: f64,
    wavelength: f64,
    is_circular_lens: bool,
    profile: Array2<Complex64>,
    geometry: PlanarGeometry,
}

impl Lens {
    /// Circular lens on `geometry`.
    ///
    /// # Arguments
    /// * `geometry` - Plane and sampling of the lens.
    /// * `focal_length` - Finite, non-zero focal length. Negative values give
    ///   a diverging lens.
    /// * `wavelength` - Design wavelength.
    pub fn new(geometry: PlanarGeometry, focal_length: f64, wavelength: f64) -> Result<Self> {
        validate_wavelength(wavelength)?;
        let profile = Self::build_profile(&geometry, focal_length, wavelength, true)?;
        Ok(Self {
            focal_length,
            wavelength,
            is_circular_lens: true,
            profile,
            geometry,
        })
    }

    fn build_profile(
        geometry: &PlanarGeometry,
        focal_length: f64,
        wavelength: f64,
        circular: bool,
    ) -> Result<Array2<Complex64>> {
        let phase = lens_phase(geometry, focal_length, wavelength)?;
        if !circular {
            return Ok(phase);
        }
        let [dx, dy] = geometry.spacing();
        let [h, w] = geometry.shape();
        let radius = (h as f64 * dx).min(w as f64 * dy) / 2.0;
        let pupil = circle(geometry, radius)?;
        Ok(phase * pupil.mapv(|v| Complex64::new(v, 0.0)))
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    pub fn is_circular_lens(&self) -> bool {
        self.is_circular_lens
    }

    /// Switch the circular pupil on or off, rebuilding the profile.
    pub fn set_circular_lens(&mut self, circular: bool) -> Result<()> {
        if circular != self.is_circular_lens {
            self.profile = Self::build_profile(&self.geometry, self.focal_length, self.wavelength, circular)?;
            self.is_circular_lens = circular;
        }
        Ok(())
    }
}

impl Planar for Lens {
    fn geometry(&self) -> &PlanarGeometry {
        &self.geometry
    }
}

impl Element for Lens {}

impl ModulationElement for Lens {
    fn modulation_profile(&self) -> ArrayView2<'_, Complex64> {
        self.profile.view()
    }
}
