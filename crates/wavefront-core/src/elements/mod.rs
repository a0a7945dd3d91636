//! Optical elements.
//!
//! Every element fixes a [`PlanarGeometry`] at construction and only accepts
//! fields sampled on exactly that geometry (including the plane `z`).
//!
//! - [`ModulationElement`]: multiplies a field by a complex planar profile
//!   (modulators, lens). Works on every field variant.
//! - [`PolarizedModulationElement`]: applies a spatially varying 3×3 Jones
//!   matrix to a [`PolarizedField`] (polarizers, waveplates).
//! - Beam splitters mix one or two coherent inputs into two outputs.
//! - Detectors map a field to plain arrays.

mod beam_splitters;
mod detectors;
mod lens;
mod modulators;
mod polarizers;

use ndarray::{Array, ArrayD, ArrayView2, ArrayView4, Dimension};
use num_complex::Complex64;

pub use self::beam_splitters::{BeamSplitter, PolarizingBeamSplitter};
pub use self::detectors::{Detector, FieldDetector, IntensityDetector};
pub use self::lens::Lens;
pub use self::modulators::{
    AmplitudeModulator, Modulator, PhaseModulator, PolarizedAmplitudeModulator, PolarizedModulator,
    PolarizedPhaseModulator,
};
pub use self::polarizers::{CircularPolarizer, Handedness, LinearPolarizer, Waveplate};

use crate::error::{OpticsError, Result};
use crate::fields::{AnyField, FieldKind, OpticalField, PolarizedField};
use crate::geometry::{Planar, PlanarGeometry};

/// Base contract of all elements.
pub trait Element: Planar {
    /// Reject fields whose geometry differs from the element's.
    fn validate_field_geometry(&self, field: &dyn Planar) -> Result<()> {
        if !self.geometry().is_same_geometry(field.geometry()) {
            return Err(OpticsError::GeometryMismatch {
                field: field.geometry().geometry_str(),
                element: self.geometry().geometry_str(),
            });
        }
        Ok(())
    }
}

/// Elements that multiply the field by a complex planar profile.
pub trait ModulationElement: Element {
    /// Complex profile of the element's planar shape.
    fn modulation_profile(&self) -> ArrayView2<'_, Complex64>;

    fn forward<F: OpticalField>(&self, field: &F) -> Result<F> {
        self.validate_field_geometry(field)?;
        field.modulate(self.modulation_profile())
    }
}

/// Elements that apply a Jones matrix field of shape `(3, 3, H, W)`.
pub trait PolarizedModulationElement: Element {
    fn polarized_modulation_profile(&self) -> ArrayView4<'_, Complex64>;

    fn forward(&self, field: &PolarizedField) -> Result<PolarizedField> {
        self.validate_field_geometry(field)?;
        field.polarized_modulate(self.polarized_modulation_profile())
    }
}

/// Dynamic single-input, single-output pipeline stage.
pub trait Transform {
    fn transform(&self, field: AnyField) -> Result<AnyField>;
}

macro_rules! impl_modulation_transform {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Transform for $ty {
                fn transform(&self, field: AnyField) -> Result<AnyField> {
                    Ok(match field {
                        AnyField::Scalar(f) => AnyField::Scalar(ModulationElement::forward(self, &f)?),
                        AnyField::Polarized(f) => AnyField::Polarized(ModulationElement::forward(self, &f)?),
                        AnyField::Coherence(f) => AnyField::Coherence(ModulationElement::forward(self, &f)?),
                    })
                }
            }
        )*
    };
}

macro_rules! impl_polarized_transform {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Transform for $ty {
                fn transform(&self, field: AnyField) -> Result<AnyField> {
                    match field {
                        AnyField::Polarized(f) => Ok(AnyField::Polarized(PolarizedModulationElement::forward(self, &f)?)),
                        other => Err(OpticsError::InvalidType {
                            expected: FieldKind::Polarized.name(),
                            found: other.kind().name(),
                        }),
                    }
                }
            }
        )*
    };
}

impl_modulation_transform!(Modulator, PhaseModulator, AmplitudeModulator, Lens);
impl_polarized_transform!(
    PolarizedModulator,
    PolarizedPhaseModulator,
    PolarizedAmplitudeModulator,
    LinearPolarizer,
    CircularPolarizer,
    Waveplate,
);

/// Convert constructor data of any rank to the expected rank, naming the
/// argument in the error.
pub(crate) fn expect_rank<T, D: Dimension, E: Dimension>(
    name: &str,
    data: Array<T, D>,
) -> Result<Array<T, E>> {
    let expected = E::NDIM.unwrap_or(0);
    let found = data.ndim();
    data.into_dyn()
        .into_dimensionality::<E>()
        .map_err(|_| OpticsError::Dimension(format!("Expected {name} to be {expected}D, got {found}D")))
}

/// Check that `(3, 3, H, W)` Jones-matrix data has the right leading axes.
pub(crate) fn expect_jones_shape<T>(name: &str, data: &ArrayD<T>) -> Result<[usize; 2]> {
    match data.shape() {
        [3, 3, h, w] => Ok([*h, *w]),
        shape => Err(OpticsError::Dimension(format!(
            "Expected {name} to have shape (3, 3, H, W), got {shape:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;
    use ndarray::Array2;

    #[test]
    fn test_geometry_mismatch_reports_both_geometries() {
        let element = Detector::new(PlanarGeometry::centered(32, 0.0, 1.0).unwrap());
        let field = Field::builder(Array2::<f64>::ones((32, 32)))
            .wavelength(700e-9)
            .spacing(1.0)
            .z(2.0)
            .build()
            .unwrap();
        match element.validate_field_geometry(&field) {
            Err(OpticsError::GeometryMismatch { field, element }) => {
                assert!(field.contains("z=2.0000e0"));
                assert!(element.contains("z=0.0000e0"));
            }
            other => panic!("expected geometry mismatch, got {other:?}"),
        }
        assert!(element.validate_field_geometry(&field.geometry().with_z(0.0).unwrap()).is_ok());
    }

    #[test]
    fn test_expect_rank() {
        let a = ndarray::Array3::<f64>::zeros((2, 3, 4));
        assert!(expect_rank::<_, _, ndarray::Ix3>("weight", a.clone()).is_ok());
        let err = expect_rank::<_, _, ndarray::Ix2>("profile", a).unwrap_err();
        assert!(err.to_string().contains("Expected profile to be 2D, got 3D"));
    }
}
