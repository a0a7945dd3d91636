//! Error taxonomy shared by every fallible operation in the crate.
//!
//! Each variant belongs to one of two broad categories reported by
//! [`OpticsError::kind`]: a *type* error (the argument is the wrong kind of
//! object altogether) or a *value* error (right kind, invalid contents).

use thiserror::Error;
use wavefront_compute::ComputeError;

/// Broad category of an [`OpticsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Type,
    Value,
}

/// Errors that can occur while building fields, planning propagation or
/// applying optical elements.
#[derive(Debug, Error)]
pub enum OpticsError {
    #[error("Invalid type: expected {expected}, found {found}")]
    InvalidType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Dimension error: {0}")]
    Dimension(String),

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid {kind} `{value}`, expected one of: {expected}")]
    InvalidOption {
        kind: &'static str,
        value: String,
        expected: String,
    },

    #[error("Field geometry does not match element geometry.\n  field:   {field}\n  element: {element}")]
    GeometryMismatch { field: String, element: String },

    #[error("Shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    #[error("Destination grid {destination} lies outside the valid region {region}")]
    OutOfBounds { destination: String, region: String },

    #[error("Field has zero total power")]
    ZeroPower,

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("No spacing was given and no default spacing has been set")]
    DefaultSpacingUnset,

    #[error("Compute backend error: {0}")]
    Compute(#[from] ComputeError),
}

impl OpticsError {
    /// Whether this is a type error or a value error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OpticsError::InvalidType { .. } => ErrorKind::Type,
            _ => ErrorKind::Value,
        }
    }

    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        OpticsError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OpticsError>;

/// Check that a wavelength is finite and strictly positive.
pub(crate) fn validate_wavelength(wavelength: f64) -> Result<()> {
    if !wavelength.is_finite() || wavelength <= 0.0 {
        return Err(OpticsError::invalid_parameter(
            "wavelength",
            format!("must be finite and positive, got {wavelength}"),
        ));
    }
    Ok(())
}
