//! # Wavefront Compute
//!
//! Compute backend abstraction for the Wavefront framework. This crate
//! provides a [`ComputeBackend`](backend::ComputeBackend) trait that isolates
//! the diffraction code from device-specific execution details.
//!
//! ## Available backends
//!
//! | Backend | Module | Status |
//! |---------|--------|--------|
//! | CPU (Rayon + rustfft) | [`cpu`] | Implemented |

pub mod backend;
pub mod cpu;

use std::sync::{Arc, OnceLock};

pub use backend::{ensure_same_device, BackendType, ComputeBackend, ComputeError, DeviceInfo};
pub use cpu::CpuBackend;

/// The process-wide default backend shared by fields and elements that are
/// constructed without an explicit backend.
pub fn default_backend() -> Arc<dyn ComputeBackend> {
    static DEFAULT: OnceLock<Arc<dyn ComputeBackend>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| {
            let backend = CpuBackend::new();
            log::debug!("Initialised default compute backend: {}", backend.device_info().name);
            Arc::new(backend)
        })
        .clone()
}
