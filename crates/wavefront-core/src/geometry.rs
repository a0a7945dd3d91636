//! Planar sampling geometry.
//!
//! A [`PlanarGeometry`] describes a rectangular grid of `shape[0] × shape[1]`
//! samples lying in the plane at longitudinal position `z`. Samples are
//! separated by `spacing` and the grid centre sits at `offset`. Coordinates
//! use `ij` indexing: $x$ varies along axis 0 and $y$ along axis 1,
//!
//! $x_i = \left(i - \tfrac{N_0 - 1}{2}\right)\Delta_x + o_x$.

use std::fmt;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{OpticsError, Result};
use crate::types::{Shape2, Vector2};

const GEOMETRY_ATOL: f64 = 1e-15;
const GEOMETRY_RTOL: f64 = 1e-9;

/// Anything that lives on a planar grid.
pub trait Planar {
    fn geometry(&self) -> &PlanarGeometry;
}

/// Sampling grid of a planar cross-section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeometryRepr")]
pub struct PlanarGeometry {
    shape: [usize; 2],
    z: f64,
    spacing: [f64; 2],
    offset: [f64; 2],
}

#[derive(Deserialize)]
struct GeometryRepr {
    shape: [usize; 2],
    #[serde(default)]
    z: f64,
    spacing: [f64; 2],
    #[serde(default)]
    offset: [f64; 2],
}

impl TryFrom<GeometryRepr> for PlanarGeometry {
    type Error = OpticsError;

    fn try_from(r: GeometryRepr) -> Result<Self> {
        PlanarGeometry::new(r.shape, r.z, Some(r.spacing.into()), Some(r.offset.into()))
    }
}

impl PlanarGeometry {
    /// Create a validated geometry.
    ///
    /// # Arguments
    /// * `shape` - Number of samples per axis; both must be non-zero.
    /// * `z` - Longitudinal position of the plane.
    /// * `spacing` - Sample spacing; `None` uses [`config::default_spacing`].
    /// * `offset` - Position of the grid centre; `None` means `[0, 0]`.
    pub fn new(
        shape: impl Into<Shape2>,
        z: f64,
        spacing: Option<Vector2>,
        offset: Option<Vector2>,
    ) -> Result<Self> {
        let shape = shape.into().0;
        let spacing = match spacing {
            Some(s) => s.0,
            None => config::default_spacing().ok_or(OpticsError::DefaultSpacingUnset)?,
        };
        let offset = offset.map_or([0.0, 0.0], |o| o.0);

        if shape.contains(&0) {
            return Err(OpticsError::invalid_parameter(
                "shape",
                format!("all dimensions must be positive, got {shape:?}"),
            ));
        }
        if !z.is_finite() {
            return Err(OpticsError::invalid_parameter("z", format!("must be finite, got {z}")));
        }
        if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(OpticsError::invalid_parameter(
                "spacing",
                format!("must be finite and positive, got {spacing:?}"),
            ));
        }
        if offset.iter().any(|o| !o.is_finite()) {
            return Err(OpticsError::invalid_parameter(
                "offset",
                format!("must be finite, got {offset:?}"),
            ));
        }

        Ok(Self {
            shape,
            z,
            spacing,
            offset,
        })
    }

    /// Geometry centred on the optical axis with an explicit spacing.
    pub fn centered(shape: impl Into<Shape2>, z: f64, spacing: impl Into<Vector2>) -> Result<Self> {
        Self::new(shape, z, Some(spacing.into()), None)
    }

    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn spacing(&self) -> [f64; 2] {
        self.spacing
    }

    pub fn offset(&self) -> [f64; 2] {
        self.offset
    }

    /// Copy of this geometry at another plane.
    pub fn with_z(&self, z: f64) -> Result<Self> {
        Self::new(self.shape, z, Some(self.spacing.into()), Some(self.offset.into()))
    }

    pub fn with_shape(&self, shape: impl Into<Shape2>) -> Result<Self> {
        Self::new(shape, self.z, Some(self.spacing.into()), Some(self.offset.into()))
    }

    pub fn with_spacing(&self, spacing: impl Into<Vector2>) -> Result<Self> {
        Self::new(self.shape, self.z, Some(spacing.into()), Some(self.offset.into()))
    }

    pub fn with_offset(&self, offset: impl Into<Vector2>) -> Result<Self> {
        Self::new(self.shape, self.z, Some(self.spacing.into()), Some(offset.into()))
    }

    /// Sample coordinates along one axis.
    pub fn axis_coords(&self, axis: usize) -> Array1<f64> {
        let n = self.shape[axis];
        let centre = (n as f64 - 1.0) / 2.0;
        Array1::from_shape_fn(n, |i| (i as f64 - centre) * self.spacing[axis] + self.offset[axis])
    }

    /// Coordinate of the first sample along one axis.
    pub(crate) fn axis_start(&self, axis: usize) -> f64 {
        self.offset[axis] - (self.shape[axis] as f64 - 1.0) / 2.0 * self.spacing[axis]
    }

    /// Coordinate grids `(x, y)` with `ij` indexing.
    pub fn meshgrid(&self) -> (Array2<f64>, Array2<f64>) {
        let xs = self.axis_coords(0);
        let ys = self.axis_coords(1);
        let shape = (self.shape[0], self.shape[1]);
        let x = Array2::from_shape_fn(shape, |(i, _)| xs[i]);
        let y = Array2::from_shape_fn(shape, |(_, j)| ys[j]);
        (x, y)
    }

    /// Area represented by a single sample.
    pub fn cell_area(&self) -> f64 {
        self.spacing[0] * self.spacing[1]
    }

    /// Physical extent between the first and last sample per axis.
    pub fn length(&self) -> [f64; 2] {
        [
            (self.shape[0] as f64 - 1.0) * self.spacing[0],
            (self.shape[1] as f64 - 1.0) * self.spacing[1],
        ]
    }

    /// Sample bounds `[x_min, x_max, y_min, y_max]`.
    pub fn bounds(&self) -> [f64; 4] {
        let [lx, ly] = self.length();
        [
            self.offset[0] - lx / 2.0,
            self.offset[0] + lx / 2.0,
            self.offset[1] - ly / 2.0,
            self.offset[1] + ly / 2.0,
        ]
    }

    /// Same shape, and matching `z`, spacing and offset within a combined
    /// absolute and relative tolerance.
    pub fn is_same_geometry(&self, other: &PlanarGeometry) -> bool {
        self.shape == other.shape && close(self.z, other.z) && self.is_same_grid(other)
    }

    /// Same sample positions in the plane, ignoring `z`.
    pub(crate) fn is_same_grid(&self, other: &PlanarGeometry) -> bool {
        self.shape == other.shape
            && (0..2).all(|a| close(self.spacing[a], other.spacing[a]) && close(self.offset[a], other.offset[a]))
    }

    /// Human-readable description used in diagnostics.
    pub fn geometry_str(&self) -> String {
        format!(
            "shape=({}, {}), z={:.4e}, spacing=({:.4e}, {:.4e}), offset=({:.4e}, {:.4e})",
            self.shape[0],
            self.shape[1],
            self.z,
            self.spacing[0],
            self.spacing[1],
            self.offset[0],
            self.offset[1]
        )
    }
}

impl fmt::Display for PlanarGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlanarGeometry({})", self.geometry_str())
    }
}

impl Planar for PlanarGeometry {
    fn geometry(&self) -> &PlanarGeometry {
        self
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= GEOMETRY_ATOL + GEOMETRY_RTOL * a.abs().max(b.abs())
}
