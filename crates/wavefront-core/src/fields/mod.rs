//! Optical fields sampled on planar grids.
//!
//! Three field variants share one contract, [`OpticalField`]:
//!
//! - [`Field`]: scalar complex amplitude $\psi(x, y)$, shape `(H, W)`.
//! - [`PolarizedField`]: vector amplitude $(E_x, E_y, E_z)$, shape `(3, H, W)`.
//! - [`CoherenceField`]: mutual coherence $\Gamma(x_1, y_1, x_2, y_2)$, shape
//!   `(H, W, H, W)`.
//!
//! Every transform returns a new field; inputs are never mutated. Fields are
//! constructed through [`FieldBuilder`], which validates rank, geometry,
//! wavelength and options eagerly.

mod coherence;
mod polarized;
mod scalar;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use ndarray::{Array, Array2, ArrayD, ArrayView2, Dimension};
use num_complex::{Complex32, Complex64};
use wavefront_compute::{default_backend, ensure_same_device, ComputeBackend};

pub use self::coherence::CoherenceField;
pub use self::polarized::PolarizedField;
pub use self::scalar::Field;

use crate::error::{validate_wavelength, OpticsError, Result};
use crate::geometry::{Planar, PlanarGeometry};
use crate::propagation::PropagationPlan;
use crate::types::{InterpolationMode, PadFactor, PropagationMethod, PropagationOptions, Shape2, Vector2};

/// Element types accepted as field data; real samples are upcast.
pub trait Sample: Copy {
    fn into_complex(self) -> Complex64;
}

impl Sample for f32 {
    fn into_complex(self) -> Complex64 {
        Complex64::new(self as f64, 0.0)
    }
}

impl Sample for f64 {
    fn into_complex(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
}

impl Sample for Complex32 {
    fn into_complex(self) -> Complex64 {
        Complex64::new(self.re as f64, self.im as f64)
    }
}

impl Sample for Complex64 {
    fn into_complex(self) -> Complex64 {
        self
    }
}

/// Upcast an array of any supported element type and rank.
pub(crate) fn to_complex_dyn<A: Sample, D: Dimension>(data: Array<A, D>) -> ArrayD<Complex64> {
    data.mapv(Sample::into_complex).into_dyn()
}

/// Which field variant a value is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Polarized,
    Coherence,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Scalar => "Field",
            FieldKind::Polarized => "PolarizedField",
            FieldKind::Coherence => "CoherenceField",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared contract of the field variants.
///
/// Implementors supply storage access, intensity, modulation and plan
/// application; statistics, normalisation and the propagation entry points
/// are provided on top of those.
pub trait OpticalField: Planar + Clone + Sized {
    const KIND: FieldKind;

    /// Planar `[H, W]` shape implied by raw data, validating rank and any
    /// non-planar axes.
    fn planar_shape(data: &ArrayD<Complex64>) -> Result<[usize; 2]>;

    /// Assemble a field from validated parts. `data` must match `geometry`.
    fn from_parts(
        data: ArrayD<Complex64>,
        wavelength: f64,
        geometry: PlanarGeometry,
        options: PropagationOptions,
        backend: Arc<dyn ComputeBackend>,
    ) -> Result<Self>;

    fn wavelength(&self) -> f64;
    fn options(&self) -> &PropagationOptions;
    fn options_mut(&mut self) -> &mut PropagationOptions;
    fn backend(&self) -> &Arc<dyn ComputeBackend>;

    /// Intensity per sample.
    fn intensity(&self) -> Array2<f64>;

    /// Copy of the field with its intensity multiplied by `factor`.
    fn scale_power(&self, factor: f64) -> Self;

    /// Multiply by a complex planar profile of the field's planar shape.
    fn modulate(&self, profile: ArrayView2<'_, Complex64>) -> Result<Self>;

    /// Carry the field through a prepared plan whose source geometry is this
    /// field's geometry.
    fn apply_plan(&self, plan: &PropagationPlan) -> Result<Self>;

    /// Total power $\sum I \, \Delta A$.
    fn power(&self) -> f64 {
        self.intensity().sum() * self.geometry().cell_area()
    }

    /// Intensity-weighted mean position `[x, y]`.
    fn centroid(&self) -> Result<[f64; 2]> {
        let intensity = self.intensity();
        let total = intensity.sum();
        if total == 0.0 || !total.is_finite() {
            return Err(OpticsError::ZeroPower);
        }
        let (x, y) = self.geometry().meshgrid();
        Ok([(&intensity * &x).sum() / total, (&intensity * &y).sum() / total])
    }

    /// Intensity-weighted standard deviation `[σx, σy]` about the centroid.
    fn std(&self) -> Result<[f64; 2]> {
        let [cx, cy] = self.centroid()?;
        let intensity = self.intensity();
        let total = intensity.sum();
        let (x, y) = self.geometry().meshgrid();
        let var_x = (&intensity * &x.mapv(|v| (v - cx).powi(2))).sum() / total;
        let var_y = (&intensity * &y.mapv(|v| (v - cy).powi(2))).sum() / total;
        Ok([var_x.sqrt(), var_y.sqrt()])
    }

    /// Rescale to the given total power.
    ///
    /// # Errors
    /// [`OpticsError::InvalidParameter`] unless `target` is finite and
    /// positive; [`OpticsError::ZeroPower`] if the field carries no power.
    fn normalize(&self, target: f64) -> Result<Self> {
        if !target.is_finite() || target <= 0.0 {
            return Err(OpticsError::invalid_parameter(
                "normalized power",
                format!("must be finite and positive, got {target}"),
            ));
        }
        let power = self.power();
        if power == 0.0 || !power.is_finite() {
            return Err(OpticsError::ZeroPower);
        }
        Ok(self.scale_power(target / power))
    }

    /// Propagate onto a grid of `shape` samples at plane `z`.
    ///
    /// `spacing` defaults to the field's spacing and `offset` to `[0, 0]`.
    fn propagate(
        &self,
        shape: impl Into<Shape2>,
        z: f64,
        spacing: Option<Vector2>,
        offset: Option<Vector2>,
    ) -> Result<Self> {
        let spacing = spacing.unwrap_or(Vector2(self.geometry().spacing()));
        let destination = PlanarGeometry::new(shape, z, Some(spacing), offset)?;
        self.propagate_to_plane(&destination)
    }

    /// Propagate to plane `z`, keeping shape, spacing and offset.
    fn propagate_to_z(&self, z: f64) -> Result<Self> {
        let destination = self.geometry().with_z(z)?;
        self.propagate_to_plane(&destination)
    }

    /// Propagate onto `destination` with the field's own options.
    fn propagate_to_plane(&self, destination: &PlanarGeometry) -> Result<Self> {
        let options = *self.options();
        self.propagate_to_plane_with(destination, &options)
    }

    /// Propagate onto `destination`, overriding the field's options for this
    /// call only.
    fn propagate_to_plane_with(&self, destination: &PlanarGeometry, options: &PropagationOptions) -> Result<Self> {
        let plan = PropagationPlan::new(
            self.geometry(),
            destination,
            self.wavelength(),
            options,
            Arc::clone(self.backend()),
        )?;
        self.apply_plan(&plan)
    }

    fn set_propagation_method(&mut self, method: PropagationMethod) {
        self.options_mut().method = method;
    }

    fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.options_mut().interpolation = mode;
    }

    fn set_asm_pad_factor(&mut self, pad: impl Into<PadFactor>) {
        self.options_mut().asm_pad_factor = pad.into();
    }
}

/// Fields that can be linearly superposed amplitude-wise.
pub trait CoherentField: OpticalField {
    /// Multiply the complex amplitude by `c`.
    fn scale_amplitude(&self, c: Complex64) -> Self;

    /// Superposition `a * self + b * other` on the shared geometry.
    fn combine(&self, a: Complex64, other: &Self, b: Complex64) -> Result<Self>;
}

/// Check that a planar profile matches a field's planar shape.
pub(crate) fn check_planar_shape(geometry: &PlanarGeometry, profile: (usize, usize)) -> Result<()> {
    let shape = geometry.shape();
    if [profile.0, profile.1] != shape {
        return Err(OpticsError::ShapeMismatch {
            left: vec![profile.0, profile.1],
            right: shape.to_vec(),
        });
    }
    Ok(())
}

/// Check that two fields can be combined sample by sample.
pub(crate) fn check_compatible<F: OpticalField>(a: &F, b: &F) -> Result<()> {
    let (sa, sb) = (a.geometry().shape(), b.geometry().shape());
    if sa != sb {
        return Err(OpticsError::ShapeMismatch {
            left: sa.to_vec(),
            right: sb.to_vec(),
        });
    }
    ensure_same_device(a.backend().as_ref(), b.backend().as_ref())?;
    Ok(())
}

/// Builder shared by all field variants.
///
/// ```ignore
/// let field = Field::builder(data)
///     .wavelength(633e-9)
///     .spacing(5e-6)
///     .z(0.0)
///     .build()?;
/// ```
pub struct FieldBuilder<F> {
    data: ArrayD<Complex64>,
    wavelength: Option<f64>,
    z: f64,
    spacing: Option<Vector2>,
    offset: Option<Vector2>,
    options: PropagationOptions,
    backend: Option<Arc<dyn ComputeBackend>>,
    _field: PhantomData<F>,
}

impl<F: OpticalField> FieldBuilder<F> {
    pub(crate) fn new(data: ArrayD<Complex64>) -> Self {
        Self {
            data,
            wavelength: None,
            z: 0.0,
            spacing: None,
            offset: None,
            options: PropagationOptions::default(),
            backend: None,
            _field: PhantomData,
        }
    }

    pub fn wavelength(mut self, wavelength: f64) -> Self {
        self.wavelength = Some(wavelength);
        self
    }

    pub fn z(mut self, z: f64) -> Self {
        self.z = z;
        self
    }

    /// Sample spacing; falls back to the ambient default if never set.
    pub fn spacing(mut self, spacing: impl Into<Vector2>) -> Self {
        self.spacing = Some(spacing.into());
        self
    }

    pub fn offset(mut self, offset: impl Into<Vector2>) -> Self {
        self.offset = Some(offset.into());
        self
    }

    pub fn options(mut self, options: PropagationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn propagation_method(mut self, method: PropagationMethod) -> Self {
        self.options.method = method;
        self
    }

    pub fn interpolation_mode(mut self, mode: InterpolationMode) -> Self {
        self.options.interpolation = mode;
        self
    }

    pub fn asm_pad_factor(mut self, pad: impl Into<PadFactor>) -> Self {
        self.options.asm_pad_factor = pad.into();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ComputeBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Validate everything and construct the field.
    pub fn build(self) -> Result<F> {
        let wavelength = self
            .wavelength
            .ok_or_else(|| OpticsError::invalid_parameter("wavelength", "must be provided"))?;
        validate_wavelength(wavelength)?;
        let shape = F::planar_shape(&self.data)?;
        let geometry = PlanarGeometry::new(shape, self.z, self.spacing, self.offset)?;
        let backend = self.backend.unwrap_or_else(default_backend);
        F::from_parts(self.data, wavelength, geometry, self.options, backend)
    }
}

/// Any field variant, for pipelines that handle fields dynamically.
#[derive(Debug, Clone)]
pub enum AnyField {
    Scalar(Field),
    Polarized(PolarizedField),
    Coherence(CoherenceField),
}

impl AnyField {
    pub fn kind(&self) -> FieldKind {
        match self {
            AnyField::Scalar(_) => FieldKind::Scalar,
            AnyField::Polarized(_) => FieldKind::Polarized,
            AnyField::Coherence(_) => FieldKind::Coherence,
        }
    }

    pub fn wavelength(&self) -> f64 {
        match self {
            AnyField::Scalar(f) => f.wavelength(),
            AnyField::Polarized(f) => f.wavelength(),
            AnyField::Coherence(f) => f.wavelength(),
        }
    }

    pub fn intensity(&self) -> Array2<f64> {
        match self {
            AnyField::Scalar(f) => f.intensity(),
            AnyField::Polarized(f) => f.intensity(),
            AnyField::Coherence(f) => f.intensity(),
        }
    }

    pub fn power(&self) -> f64 {
        match self {
            AnyField::Scalar(f) => f.power(),
            AnyField::Polarized(f) => f.power(),
            AnyField::Coherence(f) => f.power(),
        }
    }

    pub fn propagate_to_plane(&self, destination: &PlanarGeometry) -> Result<AnyField> {
        Ok(match self {
            AnyField::Scalar(f) => AnyField::Scalar(f.propagate_to_plane(destination)?),
            AnyField::Polarized(f) => AnyField::Polarized(f.propagate_to_plane(destination)?),
            AnyField::Coherence(f) => AnyField::Coherence(f.propagate_to_plane(destination)?),
        })
    }

    pub fn modulate(&self, profile: ArrayView2<'_, Complex64>) -> Result<AnyField> {
        Ok(match self {
            AnyField::Scalar(f) => AnyField::Scalar(f.modulate(profile)?),
            AnyField::Polarized(f) => AnyField::Polarized(f.modulate(profile)?),
            AnyField::Coherence(f) => AnyField::Coherence(f.modulate(profile)?),
        })
    }

    fn invalid_type(&self, expected: FieldKind) -> OpticsError {
        OpticsError::InvalidType {
            expected: expected.name(),
            found: self.kind().name(),
        }
    }
}

impl Planar for AnyField {
    fn geometry(&self) -> &PlanarGeometry {
        match self {
            AnyField::Scalar(f) => f.geometry(),
            AnyField::Polarized(f) => f.geometry(),
            AnyField::Coherence(f) => f.geometry(),
        }
    }
}

macro_rules! any_field_variant {
    ($variant:ident, $ty:ty, $kind:expr) => {
        impl From<$ty> for AnyField {
            fn from(field: $ty) -> Self {
                AnyField::$variant(field)
            }
        }

        impl TryFrom<AnyField> for $ty {
            type Error = OpticsError;

            fn try_from(field: AnyField) -> Result<Self> {
                match field {
                    AnyField::$variant(f) => Ok(f),
                    other => Err(other.invalid_type($kind)),
                }
            }
        }
    };
}

any_field_variant!(Scalar, Field, FieldKind::Scalar);
any_field_variant!(Polarized, PolarizedField, FieldKind::Polarized);
any_field_variant!(Coherence, CoherenceField, FieldKind::Coherence);

/// Shared `Debug` body for the concrete field types.
pub(crate) fn debug_field<F: OpticalField>(f: &F, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt.debug_struct(F::KIND.name())
        .field("wavelength", &f.wavelength())
        .field("geometry", f.geometry())
        .field("options", f.options())
        .field("device", &f.backend().device_info().name)
        .finish()
}
