//! CPU compute backend using Rayon for shared-memory parallelism and
//! `rustfft` for the Fourier transforms.

use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};
use num_complex::Complex64;
use rustfft::{FftDirection, FftPlanner};

use crate::backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo};

/// CPU backend that parallelises work across threads via Rayon.
pub struct CpuBackend {
    num_threads: usize,
}

impl CpuBackend {
    /// Create a new CPU backend using all available threads.
    pub fn new() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
        }
    }

    /// Create a CPU backend with a specified thread count.
    ///
    /// The count is reported in [`DeviceInfo`]; work is still scheduled on the
    /// global Rayon pool.
    pub fn with_threads(num_threads: usize) -> Self {
        Self { num_threads }
    }

    /// Transform every row, then every column, of `data` in place.
    fn transform_2d(&self, data: &mut Array2<Complex64>, direction: FftDirection) {
        let (rows, cols) = data.dim();
        if rows == 0 || cols == 0 {
            return;
        }

        let mut planner = FftPlanner::<f64>::new();
        let row_fft = planner.plan_fft(cols, direction);
        let col_fft = planner.plan_fft(rows, direction);

        // Rows are contiguous in standard layout, columns are gathered into a
        // scratch buffer.
        if !data.is_standard_layout() {
            *data = data.as_standard_layout().into_owned();
        }

        data.axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each_init(
                || vec![Complex64::new(0.0, 0.0); row_fft.get_inplace_scratch_len()],
                |scratch, mut row| {
                    if let Some(slice) = row.as_slice_mut() {
                        row_fft.process_with_scratch(slice, scratch);
                    }
                },
            );

        data.axis_iter_mut(Axis(1))
            .into_par_iter()
            .for_each_init(
                || {
                    (
                        vec![Complex64::new(0.0, 0.0); rows],
                        vec![Complex64::new(0.0, 0.0); col_fft.get_inplace_scratch_len()],
                    )
                },
                |(buffer, scratch), mut column| {
                    for (b, v) in buffer.iter_mut().zip(column.iter()) {
                        *b = *v;
                    }
                    col_fft.process_with_scratch(buffer, scratch);
                    for (v, b) in column.iter_mut().zip(buffer.iter()) {
                        *v = *b;
                    }
                },
            );
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "CPU".into(),
            backend_type: BackendType::Cpu,
            memory_bytes: None,
            compute_units: Some(self.num_threads),
        }
    }

    fn parallel_matrix_fill(
        &self,
        rows: usize,
        cols: usize,
        fill_fn: &(dyn Fn(usize, usize) -> Complex64 + Send + Sync),
    ) -> Result<Array2<Complex64>, ComputeError> {
        use rayon::prelude::*;

        let data: Vec<Complex64> = (0..rows * cols)
            .into_par_iter()
            .map(|idx| {
                let i = idx / cols;
                let j = idx % cols;
                fill_fn(i, j)
            })
            .collect();

        Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| ComputeError::DeviceError(e.to_string()))
    }

    fn fft2(&self, data: &mut Array2<Complex64>) -> Result<(), ComputeError> {
        self.transform_2d(data, FftDirection::Forward);
        Ok(())
    }

    fn ifft2(&self, data: &mut Array2<Complex64>) -> Result<(), ComputeError> {
        self.transform_2d(data, FftDirection::Inverse);
        let n = data.len();
        if n > 0 {
            let scale = 1.0 / n as f64;
            data.mapv_inplace(|v| v * scale);
        }
        Ok(())
    }
}
