//! Two-port beam splitters.
//!
//! Both splitters take one or two inputs sampled on the element geometry and
//! return the fields leaving ports 0 and 1. A missing second input is treated
//! as vacuum.

use ndarray::{s, Array3};
use num_complex::Complex64;

use super::Element;
use crate::error::{OpticsError, Result};
use crate::fields::{check_compatible, CoherentField, PolarizedField};
use crate::geometry::{Planar, PlanarGeometry};

/// Lossless beam splitter with transfer matrix
///
/// $$ T = e^{i\phi_0} \begin{pmatrix}
/// \sin\theta\, e^{i\phi_r} & \cos\theta\, e^{-i\phi_t} \\
/// \cos\theta\, e^{i\phi_t} & -\sin\theta\, e^{-i\phi_r}
/// \end{pmatrix}. $$
///
/// $\theta = \pi/4$ with zero phases is the symmetric 50:50 splitter.
#[derive(Debug, Clone)]
pub struct BeamSplitter {
    theta: f64,
    phi_0: f64,
    phi_r: f64,
    phi_t: f64,
    geometry: PlanarGeometry,
}

impl BeamSplitter {
    /// # Arguments
    /// * `geometry` - Plane and sampling of the splitter.
    /// * `theta` - Splitting angle; the reflected power fraction is $\sin^2\theta$.
    /// * `phi_0` - Global phase.
    /// * `phi_r` - Reflection phase.
    /// * `phi_t` - Transmission phase.
    pub fn new(geometry: PlanarGeometry, theta: f64, phi_0: f64, phi_r: f64, phi_t: f64) -> Result<Self> {
        for (name, value) in [("theta", theta), ("phi_0", phi_0), ("phi_r", phi_r), ("phi_t", phi_t)] {
            if !value.is_finite() {
                return Err(OpticsError::invalid_parameter(name, format!("must be finite, got {value}")));
            }
        }
        Ok(Self {
            theta,
            phi_0,
            phi_r,
            phi_t,
            geometry,
        })
    }

    /// Symmetric 50:50 splitter.
    pub fn balanced(geometry: PlanarGeometry) -> Self {
        Self {
            theta: std::f64::consts::FRAC_PI_4,
            phi_0: 0.0,
            phi_r: 0.0,
            phi_t: 0.0,
            geometry,
        }
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// The 2×2 transfer matrix, row = output port, column = input.
    pub fn transfer_matrix(&self) -> [[Complex64; 2]; 2] {
        let global = Complex64::from_polar(1.0, self.phi_0);
        let (s, c) = self.theta.sin_cos();
        [
            [
                global * Complex64::from_polar(s, self.phi_r),
                global * Complex64::from_polar(c, -self.phi_t),
            ],
            [
                global * Complex64::from_polar(c, self.phi_t),
                global * Complex64::from_polar(-s, -self.phi_r),
            ],
        ]
    }

    /// Mix `input_0` and optional `input_1` into the two output ports.
    pub fn forward<F: CoherentField>(&self, input_0: &F, input_1: Option<&F>) -> Result<(F, F)> {
        self.validate_field_geometry(input_0)?;
        let [[t00, t01], [t10, t11]] = self.transfer_matrix();
        match input_1 {
            None => Ok((input_0.scale_amplitude(t00), input_0.scale_amplitude(t10))),
            Some(input_1) => {
                self.validate_field_geometry(input_1)?;
                Ok((input_0.combine(t00, input_1, t01)?, input_0.combine(t10, input_1, t11)?))
            }
        }
    }
}

impl Planar for BeamSplitter {
    fn geometry(&self) -> &PlanarGeometry {
        &self.geometry
    }
}

impl Element for BeamSplitter {}

/// Ideal polarizing beam splitter: transmits $E_x$ and reflects $E_y$.
///
/// Port 0 carries $(E_x^{(0)}, E_y^{(1)})$ and port 1 carries
/// $(E_x^{(1)}, E_y^{(0)})$.
#[derive(Debug, Clone)]
pub struct PolarizingBeamSplitter {
    geometry: PlanarGeometry,
}

impl PolarizingBeamSplitter {
    pub fn new(geometry: PlanarGeometry) -> Self {
        Self { geometry }
    }

    fn check_transverse(field: &PolarizedField) -> Result<()> {
        if field.component(2).iter().any(|v| *v != Complex64::new(0.0, 0.0)) {
            return Err(OpticsError::UnsupportedInput(
                "PolarizingBeamSplitter does not support fields with a z-polarized component".into(),
            ));
        }
        Ok(())
    }

    pub fn forward(
        &self,
        input_0: &PolarizedField,
        input_1: Option<&PolarizedField>,
    ) -> Result<(PolarizedField, PolarizedField)> {
        self.validate_field_geometry(input_0)?;
        Self::check_transverse(input_0)?;
        if let Some(input_1) = input_1 {
            self.validate_field_geometry(input_1)?;
            check_compatible(input_0, input_1)?;
            Self::check_transverse(input_1)?;
        }

        let [h, w] = self.geometry.shape();
        let mut port_0 = Array3::<Complex64>::zeros((3, h, w));
        let mut port_1 = Array3::<Complex64>::zeros((3, h, w));
        port_0.slice_mut(s![0, .., ..]).assign(&input_0.component(0));
        port_1.slice_mut(s![1, .., ..]).assign(&input_0.component(1));
        if let Some(input_1) = input_1 {
            port_0.slice_mut(s![1, .., ..]).assign(&input_1.component(1));
            port_1.slice_mut(s![0, .., ..]).assign(&input_1.component(0));
        }
        let geometry = *input_0.geometry();
        Ok((input_0.with_data(port_0, geometry), input_0.with_data(port_1, geometry)))
    }
}

impl Planar for PolarizingBeamSplitter {
    fn geometry(&self) -> &PlanarGeometry {
        &self.geometry
    }
}

impl Element for PolarizingBeamSplitter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Field, OpticalField};
    use approx::assert_relative_eq;
    use ndarray::{Array2, Axis};

    fn geometry(n: usize) -> PlanarGeometry {
        PlanarGeometry::centered(n, 0.0, 1e-5).unwrap()
    }

    fn field() -> Field {
        let data = Array2::from_shape_fn((64, 64), |(i, j)| Complex64::new((i as f64 * 0.1).sin(), (j as f64 * 0.05).cos()));
        Field::builder(data).wavelength(700e-9).spacing(1e-5).build().unwrap()
    }

    #[test]
    fn test_transfer_matrix_is_unitary() {
        let bs = BeamSplitter::new(geometry(4), 0.3, 0.2, -0.7, 1.1).unwrap();
        let t = bs.transfer_matrix();
        for i in 0..2 {
            for j in 0..2 {
                let dot: Complex64 = (0..2).map(|k| t[k][i].conj() * t[k][j]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(dot.re, expected, epsilon = 1e-12);
                assert_relative_eq!(dot.im, 0.0, epsilon = 1e-12);
            }
        }
        assert!(BeamSplitter::new(geometry(4), f64::NAN, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_single_input_splits_power_evenly() {
        let bs = BeamSplitter::balanced(geometry(64));
        let input = field();
        let (out_0, out_1) = bs.forward(&input, None).unwrap();
        for ((a, b), i) in out_0.intensity().iter().zip(out_1.intensity().iter()).zip(input.intensity().iter()) {
            assert_relative_eq!(*a, 0.5 * i, epsilon = 1e-12);
            assert_relative_eq!(*b, 0.5 * i, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_identical_inputs_interfere() {
        let bs = BeamSplitter::new(geometry(64), std::f64::consts::FRAC_PI_4, 0.0, 0.0, 0.0).unwrap();
        let input = field();
        let (out_0, out_1) = bs.forward(&input, Some(&input)).unwrap();
        for (a, i) in out_0.intensity().iter().zip(input.intensity().iter()) {
            assert_relative_eq!(*a, 2.0 * i, epsilon = 1e-12);
        }
        assert!(out_1.intensity().iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_polarized_inputs_interfere() {
        let bs = BeamSplitter::balanced(geometry(8));
        let mut data = Array3::<f64>::zeros((3, 8, 8));
        data.index_axis_mut(Axis(0), 0).fill(1.0);
        data.index_axis_mut(Axis(0), 1).fill(0.5);
        let input = PolarizedField::builder(data).wavelength(700e-9).spacing(1e-5).build().unwrap();
        let (out_0, out_1) = bs.forward(&input, Some(&input)).unwrap();
        assert_relative_eq!(out_0.power(), 2.0 * input.power(), max_relative = 1e-12);
        assert!(out_1.power() < 1e-20);
    }

    #[test]
    fn test_beam_splitter_rejects_other_planes() {
        let elsewhere = BeamSplitter::balanced(geometry(64).with_z(0.1).unwrap());
        assert!(matches!(elsewhere.forward(&field(), None), Err(OpticsError::GeometryMismatch { .. })));
    }

    fn polarized(ex: f64, ey: f64, ez: f64) -> PolarizedField {
        let mut data = Array3::<f64>::zeros((3, 32, 32));
        for (c, v) in [ex, ey, ez].into_iter().enumerate() {
            data.index_axis_mut(Axis(0), c).fill(v);
        }
        PolarizedField::builder(data).wavelength(700e-9).spacing(1e-5).build().unwrap()
    }

    #[test]
    fn test_polarizing_beam_splitter_routes_components() {
        let pbs = PolarizingBeamSplitter::new(geometry(32));
        let (port_0, port_1) = pbs.forward(&polarized(1.0, 2.0, 0.0), Some(&polarized(3.0, 4.0, 0.0))).unwrap();
        assert_eq!(port_0.data()[[0, 5, 5]], Complex64::new(1.0, 0.0));
        assert_eq!(port_0.data()[[1, 5, 5]], Complex64::new(4.0, 0.0));
        assert_eq!(port_1.data()[[0, 5, 5]], Complex64::new(3.0, 0.0));
        assert_eq!(port_1.data()[[1, 5, 5]], Complex64::new(2.0, 0.0));

        let (port_0, port_1) = pbs.forward(&polarized(1.0, 2.0, 0.0), None).unwrap();
        assert_eq!(port_0.data()[[1, 5, 5]], Complex64::new(0.0, 0.0));
        assert_eq!(port_1.data()[[0, 5, 5]], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_polarizing_beam_splitter_rejects_z_component() {
        let pbs = PolarizingBeamSplitter::new(geometry(32));
        let err = pbs.forward(&polarized(1.0, 0.0, 0.1), None).unwrap_err();
        assert!(matches!(err, OpticsError::UnsupportedInput(_)));
        let err = pbs.forward(&polarized(1.0, 0.0, 0.0), Some(&polarized(0.0, 1.0, 1.0))).unwrap_err();
        assert!(matches!(err, OpticsError::UnsupportedInput(_)));
    }
}
