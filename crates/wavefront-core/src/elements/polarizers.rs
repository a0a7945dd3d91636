//! Uniform Jones-matrix elements.
//!
//! All matrices act on $(E_x, E_y, E_z)$ and are extended to 3×3; polarizers
//! block $E_z$ while waveplates pass it unchanged.

use ndarray::{Array4, ArrayView4};
use num_complex::Complex64;

use super::{Element, PolarizedModulationElement};
use crate::geometry::{Planar, PlanarGeometry};

type Jones = [[Complex64; 3]; 3];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

fn real(v: f64) -> Complex64 {
    Complex64::new(v, 0.0)
}

/// Broadcast one Jones matrix over the planar grid.
fn uniform_jones(geometry: &PlanarGeometry, matrix: &Jones) -> Array4<Complex64> {
    let [h, w] = geometry.shape();
    Array4::from_shape_fn((3, 3, h, w), |(i, j, _, _)| matrix[i][j])
}

macro_rules! impl_jones_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Planar for $ty {
                fn geometry(&self) -> &PlanarGeometry {
                    &self.geometry
                }
            }

            impl Element for $ty {}

            impl PolarizedModulationElement for $ty {
                fn polarized_modulation_profile(&self) -> ArrayView4<'_, Complex64> {
                    self.profile.view()
                }
            }
        )*
    };
}

/// Linear polarizer with transmission axis at angle $\theta$ from $x$,
///
/// $$ M = \begin{pmatrix} \cos^2\theta & \cos\theta\sin\theta & 0 \\
/// \cos\theta\sin\theta & \sin^2\theta & 0 \\ 0 & 0 & 0 \end{pmatrix}. $$
#[derive(Debug, Clone)]
pub struct LinearPolarizer {
    theta: f64,
    profile: Array4<Complex64>,
    geometry: PlanarGeometry,
}

impl LinearPolarizer {
    pub fn new(geometry: PlanarGeometry, theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        let matrix = [
            [real(c * c), real(c * s), ZERO],
            [real(c * s), real(s * s), ZERO],
            [ZERO, ZERO, ZERO],
        ];
        Self {
            theta,
            profile: uniform_jones(&geometry, &matrix),
            geometry,
        }
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// Circular polarizer. Left-handed:
///
/// $$ M = \frac12 \begin{pmatrix} 1 & -i \\ i & 1 \end{pmatrix}, $$
///
/// right-handed is its complex conjugate. $E_z$ is blocked.
#[derive(Debug, Clone)]
pub struct CircularPolarizer {
    handedness: Handedness,
    profile: Array4<Complex64>,
    geometry: PlanarGeometry,
}

impl CircularPolarizer {
    pub fn new(geometry: PlanarGeometry, handedness: Handedness) -> Self {
        let sign = match handedness {
            Handedness::Left => 1.0,
            Handedness::Right => -1.0,
        };
        let matrix = [
            [real(0.5), Complex64::new(0.0, -0.5 * sign), ZERO],
            [Complex64::new(0.0, 0.5 * sign), real(0.5), ZERO],
            [ZERO, ZERO, ZERO],
        ];
        Self {
            handedness,
            profile: uniform_jones(&geometry, &matrix),
            geometry,
        }
    }

    pub fn left(geometry: PlanarGeometry) -> Self {
        Self::new(geometry, Handedness::Left)
    }

    pub fn right(geometry: PlanarGeometry) -> Self {
        Self::new(geometry, Handedness::Right)
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }
}

/// Waveplate with retardance $\phi$ and fast axis at $\theta$.
///
/// $$ M = \begin{pmatrix}
/// \cos^2\theta + e^{i\phi}\sin^2\theta & (1 - e^{i\phi})\cos\theta\sin\theta \\
/// (1 - e^{i\phi})\cos\theta\sin\theta & \sin^2\theta + e^{i\phi}\cos^2\theta
/// \end{pmatrix}, \qquad M_{zz} = 1. $$
#[derive(Debug, Clone)]
pub struct Waveplate {
    phi: f64,
    theta: f64,
    profile: Array4<Complex64>,
    geometry: PlanarGeometry,
}

impl Waveplate {
    pub fn new(geometry: PlanarGeometry, phi: f64, theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        let retard = Complex64::new(0.0, phi).exp();
        let cross = (real(1.0) - retard) * (c * s);
        let matrix = [
            [real(c * c) + retard * (s * s), cross, ZERO],
            [cross, real(s * s) + retard * (c * c), ZERO],
            [ZERO, ZERO, real(1.0)],
        ];
        Self {
            phi,
            theta,
            profile: uniform_jones(&geometry, &matrix),
            geometry,
        }
    }

    /// $\lambda/4$ plate, $\phi = \pi/2$.
    pub fn quarter_wave(geometry: PlanarGeometry, theta: f64) -> Self {
        Self::new(geometry, std::f64::consts::FRAC_PI_2, theta)
    }

    /// $\lambda/2$ plate, $\phi = \pi$.
    pub fn half_wave(geometry: PlanarGeometry, theta: f64) -> Self {
        Self::new(geometry, std::f64::consts::PI, theta)
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }
}

impl_jones_element!(LinearPolarizer, CircularPolarizer, Waveplate);
