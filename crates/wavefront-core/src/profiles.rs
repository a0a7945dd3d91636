//! Analytic profile generators.
//!
//! Pure functions producing initial field data or element profiles sampled
//! on a [`PlanarGeometry`]. Coordinates are taken relative to the geometry
//! centre, so a profile is always centred in its array regardless of the
//! grid offset.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, Array4};
use num_complex::Complex64;

use crate::error::{OpticsError, Result};
use crate::geometry::PlanarGeometry;
use crate::types::Vector2;

fn require_positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(OpticsError::invalid_parameter(
            name,
            format!("must be finite and positive, got {value}"),
        ));
    }
    Ok(())
}

/// Coordinates along one axis relative to the grid centre.
fn centred_coords(geometry: &PlanarGeometry, axis: usize) -> Array1<f64> {
    geometry.axis_coords(axis) - geometry.offset()[axis]
}

/// Evaluate `f(x, y)` on centred coordinates.
fn sample<T>(geometry: &PlanarGeometry, f: impl Fn(f64, f64) -> T) -> Array2<T> {
    let xs = centred_coords(geometry, 0);
    let ys = centred_coords(geometry, 1);
    let [h, w] = geometry.shape();
    Array2::from_shape_fn((h, w), |(i, j)| f(xs[i], ys[j]))
}

/// Gaussian amplitude $e^{-(x^2 + y^2)/w_0^2}$ with waist radius $w_0$.
pub fn gaussian(geometry: &PlanarGeometry, waist_radius: f64) -> Result<Array2<f64>> {
    require_positive("waist_radius", waist_radius)?;
    let w_sq = waist_radius * waist_radius;
    Ok(sample(geometry, |x, y| (-(x * x + y * y) / w_sq).exp()))
}

/// Physicists' Hermite polynomial $H_n(t)$.
fn hermite(n: u32, t: f64) -> f64 {
    let (mut prev, mut curr) = (1.0, 2.0 * t);
    if n == 0 {
        return prev;
    }
    for k in 1..n {
        let next = 2.0 * t * curr - 2.0 * k as f64 * prev;
        prev = curr;
        curr = next;
    }
    curr
}

/// One-dimensional Hermite–Gaussian mode with unit $L^2$ norm,
/// $u_m(x) = \frac{(2/\pi)^{1/4}}{\sqrt{2^m m!\, w_0}} H_m\!\left(\frac{\sqrt2 x}{w_0}\right) e^{-x^2/w_0^2}$.
fn hermite_gaussian_1d(m: u32, x: f64, waist_radius: f64) -> f64 {
    let factorial: f64 = (1..=m).map(f64::from).product();
    let norm = (2.0 / PI).powf(0.25) / (2f64.powi(m as i32) * factorial * waist_radius).sqrt();
    norm * hermite(m, 2f64.sqrt() * x / waist_radius) * (-(x * x) / (waist_radius * waist_radius)).exp()
}

/// Hermite–Gaussian mode $\mathrm{HG}_{mn}$, normalised so that
/// $\iint |u|^2 \, dx\, dy = 1$.
pub fn hermite_gaussian(geometry: &PlanarGeometry, m: u32, n: u32, waist_radius: f64) -> Result<Array2<f64>> {
    require_positive("waist_radius", waist_radius)?;
    Ok(sample(geometry, |x, y| {
        hermite_gaussian_1d(m, x, waist_radius) * hermite_gaussian_1d(n, y, waist_radius)
    }))
}

/// Circular aperture: 1 inside radius, 0 outside.
pub fn circle(geometry: &PlanarGeometry, radius: f64) -> Result<Array2<f64>> {
    require_positive("radius", radius)?;
    let r_sq = radius * radius;
    Ok(sample(geometry, |x, y| if x * x + y * y <= r_sq { 1.0 } else { 0.0 }))
}

/// Rectangular aperture of full side lengths `size`.
pub fn rectangle(geometry: &PlanarGeometry, size: impl Into<Vector2>) -> Result<Array2<f64>> {
    let [sx, sy] = size.into().0;
    require_positive("size", sx)?;
    require_positive("size", sy)?;
    Ok(sample(geometry, |x, y| {
        if x.abs() <= sx / 2.0 && y.abs() <= sy / 2.0 {
            1.0
        } else {
            0.0
        }
    }))
}

/// Thin-lens phase $\exp\left(-i\pi r^2 / \lambda f\right)$.
pub fn lens_phase(geometry: &PlanarGeometry, focal_length: f64, wavelength: f64) -> Result<Array2<Complex64>> {
    if !focal_length.is_finite() || focal_length == 0.0 {
        return Err(OpticsError::invalid_parameter(
            "focal_length",
            format!("must be finite and non-zero, got {focal_length}"),
        ));
    }
    require_positive("wavelength", wavelength)?;
    let scale = -PI / (wavelength * focal_length);
    Ok(sample(geometry, |x, y| Complex64::new(0.0, scale * (x * x + y * y)).exp()))
}

/// Gaussian Schell-model mutual coherence,
///
/// $$ \Gamma = \sqrt{I(x_1, y_1) I(x_2, y_2)}\;
/// \exp\left(-\frac{(x_1 - x_2)^2 + (y_1 - y_2)^2}{2\sigma_c^2}\right), \qquad
/// I = \frac{2}{\pi w_0^2} e^{-2(x^2 + y^2)/w_0^2}. $$
///
/// A coherence width of zero gives a fully incoherent field (non-zero only on
/// the diagonal).
pub fn gaussian_schell_model(
    geometry: &PlanarGeometry,
    waist_radius: f64,
    coherence_width: f64,
) -> Result<Array4<f64>> {
    require_positive("waist_radius", waist_radius)?;
    if !coherence_width.is_finite() || coherence_width < 0.0 {
        return Err(OpticsError::invalid_parameter(
            "coherence_width",
            format!("must be finite and non-negative, got {coherence_width}"),
        ));
    }
    let w_sq = waist_radius * waist_radius;
    let amplitude = sample(geometry, |x, y| {
        (2.0 / (PI * w_sq) * (-2.0 * (x * x + y * y) / w_sq).exp()).sqrt()
    });
    let xs = centred_coords(geometry, 0);
    let ys = centred_coords(geometry, 1);
    let mu = |i: usize, j: usize, k: usize, l: usize| {
        if coherence_width == 0.0 {
            if i == k && j == l {
                1.0
            } else {
                0.0
            }
        } else {
            let (dx, dy) = (xs[i] - xs[k], ys[j] - ys[l]);
            (-(dx * dx + dy * dy) / (2.0 * coherence_width * coherence_width)).exp()
        }
    };
    let [h, w] = geometry.shape();
    Ok(Array4::from_shape_fn((h, w, h, w), |(i, j, k, l)| {
        amplitude[[i, j]] * amplitude[[k, l]] * mu(i, j, k, l)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hermite_recurrence() {
        assert_eq!(hermite(0, 0.7), 1.0);
        assert_eq!(hermite(1, 0.7), 1.4);
        // H_3(t) = 8t^3 - 12t
        assert_relative_eq!(hermite(3, 0.7), 8.0 * 0.343 - 12.0 * 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_hermite_gaussian_modes_are_orthonormal() {
        let g = PlanarGeometry::centered(120, 0.0, 1e-5).unwrap();
        let modes: Vec<Array2<f64>> = [(0, 0), (1, 0), (0, 1), (2, 1)]
            .iter()
            .map(|&(m, n)| hermite_gaussian(&g, m, n, 1e-4).unwrap())
            .collect();
        for (a, ma) in modes.iter().enumerate() {
            for (b, mb) in modes.iter().enumerate() {
                let overlap = (ma * mb).sum() * g.cell_area();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((overlap - expected).abs() < 1e-6, "<{a}|{b}> = {overlap}");
            }
        }
    }

    #[test]
    fn test_profiles_are_centred_on_grid() {
        let g = PlanarGeometry::new(5, 0.0, Some(1.0.into()), Some((100.0, -3.0).into())).unwrap();
        let p = gaussian(&g, 1.0).unwrap();
        assert_eq!(p[[2, 2]], 1.0);
        let c = circle(&g, 1.0).unwrap();
        assert_eq!(c.sum(), 5.0);
        let r = rectangle(&g, (2.0, 4.0)).unwrap();
        assert_eq!(r.sum(), 15.0);
        assert!(gaussian(&g, 0.0).is_err());
    }

    #[test]
    fn test_lens_phase_is_unit_modulus() {
        let g = PlanarGeometry::centered(16, 0.0, 1e-6).unwrap();
        let l = lens_phase(&g, 0.1, 5e-7).unwrap();
        assert!(l.iter().all(|v| (v.norm() - 1.0).abs() < 1e-12));
        assert!(lens_phase(&g, 0.0, 5e-7).is_err());
    }

    #[test]
    fn test_gaussian_schell_model_diagonal() {
        let g = PlanarGeometry::centered(6, 0.0, 1.0).unwrap();
        let gamma = gaussian_schell_model(&g, 2.0, 0.0).unwrap();
        assert_eq!(gamma[[1, 2, 3, 2]], 0.0);
        assert_relative_eq!(
            gamma[[2, 2, 2, 2]],
            2.0 / (PI * 4.0) * (-2.0 * 0.5 / 4.0_f64).exp(),
            epsilon = 1e-12
        );
        assert!(gaussian_schell_model(&g, 2.0, -1.0).is_err());
    }
}
