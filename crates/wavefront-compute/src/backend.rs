//! Compute backend trait and device abstraction.
//!
//! The [`ComputeBackend`] trait abstracts over execution environments so that
//! the diffraction code in `wavefront-core` stays device-agnostic. Every
//! array taking part in one operation is expected to live on the same device;
//! [`ensure_same_device`] is the check used at those boundaries.

use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Device error: {0}")]
    DeviceError(String),

    #[error("Operands live on different devices: {left} vs {right}")]
    DeviceMismatch { left: String, right: String },

    #[error("Shape mismatch in {operation}: {left:?} vs {right:?}")]
    ShapeMismatch {
        operation: &'static str,
        left: [usize; 2],
        right: [usize; 2],
    },
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub memory_bytes: Option<usize>,
    pub compute_units: Option<usize>,
}

/// The type of compute backend.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Cpu,
}

/// Abstraction over compute backends.
///
/// Implementations provide device-specific execution for the hot-path
/// operations of planar propagation: kernel assembly, 2D Fourier transforms
/// and the dense products of the separable Fresnel integrals.
pub trait ComputeBackend: Send + Sync {
    /// Return information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// Fill a `rows × cols` complex matrix element-wise in parallel.
    ///
    /// This is the entry point for sampling impulse responses, transfer
    /// functions and interpolation results: each entry is independent.
    fn parallel_matrix_fill(
        &self,
        rows: usize,
        cols: usize,
        fill_fn: &(dyn Fn(usize, usize) -> Complex64 + Send + Sync),
    ) -> Result<Array2<Complex64>, ComputeError>;

    /// In-place forward 2D discrete Fourier transform (unnormalised).
    fn fft2(&self, data: &mut Array2<Complex64>) -> Result<(), ComputeError>;

    /// In-place inverse 2D discrete Fourier transform, normalised by the
    /// number of samples so that `ifft2(fft2(x)) == x`.
    fn ifft2(&self, data: &mut Array2<Complex64>) -> Result<(), ComputeError>;

    /// Dense complex matrix product $\mathbf{C} = \mathbf{A}\mathbf{B}$.
    fn matmul(
        &self,
        a: ArrayView2<'_, Complex64>,
        b: ArrayView2<'_, Complex64>,
    ) -> Result<Array2<Complex64>, ComputeError> {
        if a.ncols() != b.nrows() {
            return Err(ComputeError::ShapeMismatch {
                operation: "matmul",
                left: [a.nrows(), a.ncols()],
                right: [b.nrows(), b.ncols()],
            });
        }
        Ok(a.dot(&b))
    }
}

/// Check that two backends refer to the same device.
pub fn ensure_same_device(
    left: &dyn ComputeBackend,
    right: &dyn ComputeBackend,
) -> Result<(), ComputeError> {
    let (l, r) = (left.device_info(), right.device_info());
    if l.backend_type != r.backend_type || l.name != r.name {
        return Err(ComputeError::DeviceMismatch {
            left: l.name,
            right: r.name,
        });
    }
    Ok(())
}
