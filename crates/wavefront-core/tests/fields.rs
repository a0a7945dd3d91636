//! Integration tests: field construction, observables and the dynamic
//! `AnyField` surface.

use approx::assert_relative_eq;
use ndarray::{Array1, Array2, Array3, Axis};
use num_complex::Complex64;
use wavefront_core::error::{ErrorKind, OpticsError};
use wavefront_core::fields::{AnyField, CoherenceField, Field, PolarizedField};
use wavefront_core::geometry::PlanarGeometry;
use wavefront_core::prelude::*;
use wavefront_core::profiles::{gaussian, hermite_gaussian};
use wavefront_core::types::{InterpolationMode, PadFactor, PropagationMethod, PropagationOptions};

// ─── Geometry ──────────────────────────────────────────────────────────────

#[test]
fn test_meshgrid_centroid_and_extent() {
    let cases = [
        ((5, 7), [1.0, 2.0], [0.0, 0.0]),
        ((64, 33), [1e-5, 3e-6], [2e-4, -7e-5]),
        ((1, 10), [0.5, 0.5], [3.0, 4.0]),
    ];
    for (shape, spacing, offset) in cases {
        let g = PlanarGeometry::new(shape, 0.3, Some(spacing.into()), Some(offset.into())).unwrap();
        let (x, y) = g.meshgrid();
        assert_relative_eq!(x.mean().unwrap(), offset[0], epsilon = 1e-12);
        assert_relative_eq!(y.mean().unwrap(), offset[1], epsilon = 1e-12);
        let extent_x = x.fold(f64::MIN, |m, &v| m.max(v)) - x.fold(f64::MAX, |m, &v| m.min(v));
        let extent_y = y.fold(f64::MIN, |m, &v| m.max(v)) - y.fold(f64::MAX, |m, &v| m.min(v));
        assert_relative_eq!(extent_x, (shape.0 - 1) as f64 * spacing[0], max_relative = 1e-12);
        assert_relative_eq!(extent_y, (shape.1 - 1) as f64 * spacing[1], max_relative = 1e-12);
        assert_relative_eq!(g.cell_area(), spacing[0] * spacing[1]);
    }
}

#[test]
fn test_geometry_validation() {
    assert!(PlanarGeometry::centered((0, 4), 0.0, 1.0).is_err());
    assert!(PlanarGeometry::centered(4, f64::INFINITY, 1.0).is_err());
    assert!(PlanarGeometry::centered(4, 0.0, (1.0, -1.0)).is_err());
    let err = PlanarGeometry::centered(4, 0.0, 0.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}

// ─── Construction ──────────────────────────────────────────────────────────

#[test]
fn test_field_construction_validation() {
    let one_d = Field::builder(Array1::<f64>::ones(8)).wavelength(1e-6).spacing(1.0).build();
    assert!(matches!(one_d, Err(OpticsError::Dimension(_))));

    let polarized = PolarizedField::builder(Array3::<f64>::ones((2, 8, 8))).wavelength(1e-6).spacing(1.0).build();
    assert!(matches!(polarized, Err(OpticsError::Dimension(_))));

    let method: Result<PropagationMethod, _> = "NOT_A_METHOD".parse();
    let err = method.unwrap_err();
    assert!(matches!(err, OpticsError::InvalidOption { .. }));
    assert_eq!(err.kind(), ErrorKind::Value);

    assert!("cubic".parse::<InterpolationMode>().is_err());
    assert!("(1, -2)".parse::<PadFactor>().is_err());
}

#[test]
fn test_builder_applies_options() {
    let field = Field::builder(Array2::<f64>::ones((8, 8)))
        .wavelength(633e-9)
        .spacing((1e-6, 2e-6))
        .offset((1e-5, 0.0))
        .z(0.25)
        .propagation_method(PropagationMethod::FresnelTwoStep)
        .interpolation_mode(InterpolationMode::Bicubic)
        .asm_pad_factor(PadFactor::Auto)
        .build()
        .unwrap();
    assert_eq!(
        *field.options(),
        PropagationOptions {
            method: PropagationMethod::FresnelTwoStep,
            interpolation: InterpolationMode::Bicubic,
            asm_pad_factor: PadFactor::Auto,
        }
    );
    assert_eq!(field.geometry().spacing(), [1e-6, 2e-6]);
    assert_eq!(field.geometry().z(), 0.25);
    assert_eq!(field.wavelength(), 633e-9);
}

// ─── Observables ───────────────────────────────────────────────────────────

fn hg_field(m: u32, n: u32, offset: [f64; 2]) -> Field {
    let g = PlanarGeometry::new(120, 0.0, Some(1e-5.into()), Some(offset.into())).unwrap();
    Field::builder(hermite_gaussian(&g, m, n, 1.5e-4).unwrap())
        .wavelength(700e-9)
        .spacing(1e-5)
        .offset(offset)
        .build()
        .unwrap()
}

#[test]
fn test_normalize_sets_power() {
    let field = hg_field(1, 2, [0.0, 0.0]);
    assert_relative_eq!(field.power(), 1.0, max_relative = 1e-6);
    for target in [1e-3, 0.5, 2.53, 40.0] {
        assert_relative_eq!(field.normalize(target).unwrap().power(), target, max_relative = 1e-12);
    }
    assert!(field.normalize(0.0).is_err());

    let zero = Field::builder(Array2::<f64>::zeros((8, 8))).wavelength(1e-6).spacing(1.0).build().unwrap();
    assert!(matches!(zero.normalize(1.0), Err(OpticsError::ZeroPower)));
    assert!(matches!(zero.centroid(), Err(OpticsError::ZeroPower)));
}

#[test]
fn test_centroid_and_std_of_gaussian() {
    let offset = [3e-4, -1e-4];
    let g = PlanarGeometry::new(128, 0.0, Some(1e-5.into()), Some(offset.into())).unwrap();
    let waist = 2e-4;
    let field = Field::builder(gaussian(&g, waist).unwrap())
        .wavelength(1e-6)
        .spacing(1e-5)
        .offset(offset)
        .build()
        .unwrap();
    let [cx, cy] = field.centroid().unwrap();
    assert_relative_eq!(cx, offset[0], epsilon = 1e-12);
    assert_relative_eq!(cy, offset[1], epsilon = 1e-12);
    // Intensity e^{-2r²/w²} has standard deviation w/2 per axis.
    let [sx, sy] = field.std().unwrap();
    assert_relative_eq!(sx, waist / 2.0, max_relative = 1e-3);
    assert_relative_eq!(sy, waist / 2.0, max_relative = 1e-3);
}

#[test]
fn test_hermite_gaussian_inner_products() {
    let a = hg_field(0, 1, [0.0, 0.0]);
    let b = hg_field(1, 0, [0.0, 0.0]);
    assert_relative_eq!(a.inner(&a).unwrap().re, 1.0, max_relative = 1e-6);
    assert!(a.inner(&b).unwrap().norm() < 1e-12);
}

#[test]
fn test_propagate_keeps_field_spacing_by_default() {
    let field = hg_field(0, 0, [0.0, 0.0]);
    let out = field.propagate((60, 80), 0.01, None, None).unwrap();
    assert_eq!(out.geometry().shape(), [60, 80]);
    assert_eq!(out.geometry().spacing(), [1e-5, 1e-5]);
    assert_eq!(out.geometry().z(), 0.01);
    assert_relative_eq!(out.power(), field.power(), max_relative = 1e-3);
    // The source is untouched.
    assert_eq!(field.geometry().z(), 0.0);
}

#[test]
fn test_per_call_options_override() {
    let field = hg_field(0, 0, [0.0, 0.0]);
    let destination = field.geometry().with_z(0.02).unwrap();
    let options = field.options().with_method(PropagationMethod::Dim);
    let a = field.propagate_to_plane_with(&destination, &options).unwrap();
    assert_eq!(a.options().method, PropagationMethod::Asm);

    let mut dim = field.clone();
    dim.set_propagation_method(PropagationMethod::Dim);
    let b = dim.propagate_to_plane(&destination).unwrap();
    assert_eq!(a.data(), b.data());
}

// ─── AnyField ──────────────────────────────────────────────────────────────

#[test]
fn test_any_field_round_trips_variants() {
    let field = hg_field(0, 0, [0.0, 0.0]);
    let any = AnyField::from(field.clone());
    assert_eq!(any.kind().name(), "Field");
    assert_relative_eq!(any.power(), field.power());

    let err = PolarizedField::try_from(any.clone()).unwrap_err();
    assert!(matches!(err, OpticsError::InvalidType { expected: "PolarizedField", found: "Field" }));
    assert_eq!(err.kind(), ErrorKind::Type);

    let back = Field::try_from(any).unwrap();
    assert_eq!(back.data(), field.data());

    let small = Field::builder(Array2::<f64>::ones((8, 8))).wavelength(1e-6).spacing(1e-5).build().unwrap();
    let coherence = AnyField::from(CoherenceField::from_field(&small).unwrap());
    assert_eq!(coherence.kind().name(), "CoherenceField");
}

#[test]
fn test_any_field_modulate_and_propagate() {
    let mut data = Array3::<Complex64>::zeros((3, 16, 16));
    data.index_axis_mut(Axis(0), 1).fill(Complex64::new(0.0, 1.0));
    let polarized = PolarizedField::builder(data).wavelength(1e-6).spacing(1e-5).build().unwrap();
    let any = AnyField::from(polarized);
    let half = Array2::from_elem((16, 16), Complex64::new(0.5, 0.0));
    let modulated = any.modulate(half.view()).unwrap();
    assert_relative_eq!(modulated.power(), any.power() / 4.0, max_relative = 1e-12);

    let destination = any.geometry().with_z(1e-3).unwrap();
    let moved = modulated.propagate_to_plane(&destination).unwrap();
    assert_eq!(moved.kind().name(), "PolarizedField");
    assert_eq!(moved.geometry().z(), 1e-3);
}
