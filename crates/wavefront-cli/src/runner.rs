//! Job runner: builds the source field, walks it through the element chain
//! and records what the detector sees.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ndarray::{Array2, Array3, Axis};
use num_complex::Complex64;
use serde::Serialize;

use wavefront_compute::{default_backend, ComputeBackend, CpuBackend};
use wavefront_core::elements::{
    AmplitudeModulator, CircularPolarizer, Detector, Handedness, Lens, LinearPolarizer, PhaseModulator, Transform,
    Waveplate,
};
use wavefront_core::fields::{AnyField, Field, OpticalField, PolarizedField};
use wavefront_core::geometry::{Planar, PlanarGeometry};
use wavefront_core::profiles;
use wavefront_core::types::Vector2;

use crate::config::{
    ElementConfig, FieldConfig, HandednessConfig, JobConfig, PolarizationConfig, PolarizationState, ProfileConfig,
};

/// What the detector recorded at the end of a run.
#[derive(Debug, Serialize)]
pub struct DetectorReading {
    pub wavelength: f64,
    pub z: f64,
    pub shape: [usize; 2],
    pub spacing: [f64; 2],
    pub offset: [f64; 2],
    pub method: String,
    pub total_power: f64,
    /// `None` when no power reaches the detector.
    pub centroid: Option<[f64; 2]>,
    pub std: Option<[f64; 2]>,
    /// Power collected by each cell, $I\,\Delta A$.
    pub power: Array2<f64>,
}

/// An element ready to act on the field, with the plane it sits on.
struct Stage {
    name: &'static str,
    z: f64,
    element: Box<dyn Transform>,
}

/// Select the compute backend for the job.
pub fn create_backend(threads: Option<usize>) -> Arc<dyn ComputeBackend> {
    match threads {
        Some(n) => Arc::new(CpuBackend::with_threads(n)),
        None => default_backend(),
    }
}

/// Build the source field and every element without propagating anything.
pub fn validate_job(job: &JobConfig) -> Result<()> {
    let field = build_source(&job.field, job, default_backend())?;
    let stages = build_stages(&job.elements, field.geometry(), job.field.wavelength)?;
    detector_geometry(job, field.geometry())?;
    log::debug!("Validated job: {} element(s)", stages.len());
    Ok(())
}

/// Run a full job from a parsed configuration.
pub fn run_job(job: &JobConfig) -> Result<DetectorReading> {
    let backend = create_backend(job.compute.threads);
    println!("Backend: {}", backend.device_info().name);

    let mut field = build_source(&job.field, job, backend)?;
    let source = *field.geometry();
    println!("Source: {} ({})", field.kind().name(), source.geometry_str());
    println!("  power = {:.6e}", field.power());

    let stages = build_stages(&job.elements, &source, job.field.wavelength)?;
    for (index, stage) in stages.iter().enumerate() {
        let plane = source.with_z(stage.z)?;
        field = field
            .propagate_to_plane(&plane)
            .with_context(|| format!("Propagating to element {} ({}) at z = {}", index, stage.name, stage.z))?;
        field = stage
            .element
            .transform(field)
            .with_context(|| format!("Applying element {} ({})", index, stage.name))?;
        println!(
            "  [{}/{}] {} at z = {}: power = {:.6e}",
            index + 1,
            stages.len(),
            stage.name,
            stage.z,
            field.power()
        );
    }

    let destination = detector_geometry(job, &source)?;
    let field = field
        .propagate_to_plane(&destination)
        .with_context(|| format!("Propagating to detector at z = {}", destination.z()))?;
    let detector = Detector::new(destination);

    let reading = match &field {
        AnyField::Scalar(f) => read_detector(f, &detector),
        AnyField::Polarized(f) => read_detector(f, &detector),
        AnyField::Coherence(f) => read_detector(f, &detector),
    }?;
    println!("Detector ({}): power = {:.6e}", destination.geometry_str(), reading.total_power);
    Ok(reading)
}

fn read_detector<F: OpticalField>(field: &F, detector: &Detector) -> Result<DetectorReading> {
    let power = detector.forward(field)?;
    let geometry = field.geometry();
    Ok(DetectorReading {
        wavelength: field.wavelength(),
        z: geometry.z(),
        shape: geometry.shape(),
        spacing: geometry.spacing(),
        offset: geometry.offset(),
        method: field.options().method.to_string(),
        total_power: power.sum(),
        centroid: field.centroid().ok(),
        std: field.std().ok(),
        power,
    })
}

/// Build the source field on its initial plane.
fn build_source(config: &FieldConfig, job: &JobConfig, backend: Arc<dyn ComputeBackend>) -> Result<AnyField> {
    let geometry = PlanarGeometry::new(
        config.shape,
        config.z,
        Some(config.spacing.into()),
        Some(config.offset.into()),
    )
    .context("Invalid source grid")?;
    let profile = build_profile(&config.profile, &geometry).context("Invalid source profile")?;

    let field: AnyField = match &config.polarization {
        None => Field::builder(profile)
            .wavelength(config.wavelength)
            .z(config.z)
            .spacing(config.spacing)
            .offset(config.offset)
            .options(job.propagation)
            .backend(backend)
            .build()?
            .into(),
        Some(polarization) => {
            let jones = jones_vector(polarization);
            let [h, w] = geometry.shape();
            let mut data = Array3::<Complex64>::zeros((3, h, w));
            for (component, &amplitude) in jones.iter().enumerate() {
                data.index_axis_mut(Axis(0), component)
                    .assign(&profile.mapv(|v| amplitude * v));
            }
            PolarizedField::builder(data)
                .wavelength(config.wavelength)
                .z(config.z)
                .spacing(config.spacing)
                .offset(config.offset)
                .options(job.propagation)
                .backend(backend)
                .build()?
                .into()
        }
    };
    Ok(field)
}

fn build_profile(profile: &ProfileConfig, geometry: &PlanarGeometry) -> wavefront_core::Result<Array2<f64>> {
    match *profile {
        ProfileConfig::Gaussian { waist_radius } => profiles::gaussian(geometry, waist_radius),
        ProfileConfig::HermiteGaussian { m, n, waist_radius } => {
            profiles::hermite_gaussian(geometry, m, n, waist_radius)
        }
        ProfileConfig::Circle { radius } => profiles::circle(geometry, radius),
        ProfileConfig::Rectangle { size } => profiles::rectangle(geometry, size),
        ProfileConfig::Uniform => Ok(Array2::ones(geometry.shape())),
    }
}

/// Transverse Jones vector `[Ex, Ey]`. Left circular is $(1, i)/\sqrt{2}$.
fn jones_vector(polarization: &PolarizationConfig) -> [Complex64; 2] {
    let r = std::f64::consts::FRAC_1_SQRT_2;
    let re = |v: f64| Complex64::new(v, 0.0);
    match polarization {
        PolarizationConfig::Jones([ex, ey]) => [re(*ex), re(*ey)],
        PolarizationConfig::Named(state) => match state {
            PolarizationState::X => [re(1.0), re(0.0)],
            PolarizationState::Y => [re(0.0), re(1.0)],
            PolarizationState::Diagonal => [re(r), re(r)],
            PolarizationState::Antidiagonal => [re(r), re(-r)],
            PolarizationState::Left => [re(r), Complex64::new(0.0, r)],
            PolarizationState::Right => [re(r), Complex64::new(0.0, -r)],
        },
    }
}

/// Build the element chain. Each element shares the source grid on its own plane.
fn build_stages(configs: &[ElementConfig], source: &PlanarGeometry, wavelength: f64) -> Result<Vec<Stage>> {
    configs
        .iter()
        .enumerate()
        .map(|(index, config)| {
            let geometry = source.with_z(config.z())?;
            let element = build_element(config, geometry, wavelength)
                .with_context(|| format!("Element {} ({})", index, config.name()))?;
            Ok(Stage {
                name: config.name(),
                z: config.z(),
                element,
            })
        })
        .collect()
}

fn build_element(config: &ElementConfig, geometry: PlanarGeometry, wavelength: f64) -> Result<Box<dyn Transform>> {
    let spacing: Option<Vector2> = Some(geometry.spacing().into());
    let offset: Option<Vector2> = Some(geometry.offset().into());
    let element: Box<dyn Transform> = match *config {
        ElementConfig::Lens { focal_length, circular, .. } => {
            let mut lens = Lens::new(geometry, focal_length, wavelength)?;
            lens.set_circular_lens(circular)?;
            Box::new(lens)
        }
        ElementConfig::Aperture { z, radius, size } => {
            let mask = match (radius, size) {
                (Some(radius), None) => profiles::circle(&geometry, radius)?,
                (None, Some(size)) => profiles::rectangle(&geometry, size)?,
                _ => anyhow::bail!("aperture requires exactly one of 'radius' or 'size'"),
            };
            Box::new(AmplitudeModulator::new(mask, z, spacing, offset)?)
        }
        ElementConfig::PhasePlate { z, phase, tilt } => {
            let (x, y) = geometry.meshgrid();
            let phi = (x * tilt[0] + y * tilt[1]) + phase;
            Box::new(PhaseModulator::new(phi, z, spacing, offset)?)
        }
        ElementConfig::LinearPolarizer { theta, .. } => Box::new(LinearPolarizer::new(geometry, theta)),
        ElementConfig::CircularPolarizer { handedness, .. } => {
            let handedness = match handedness {
                HandednessConfig::Left => Handedness::Left,
                HandednessConfig::Right => Handedness::Right,
            };
            Box::new(CircularPolarizer::new(geometry, handedness))
        }
        ElementConfig::Waveplate { phi, theta, .. } => Box::new(Waveplate::new(geometry, phi, theta)),
        ElementConfig::QuarterWaveplate { theta, .. } => Box::new(Waveplate::quarter_wave(geometry, theta)),
        ElementConfig::HalfWaveplate { theta, .. } => Box::new(Waveplate::half_wave(geometry, theta)),
    };
    Ok(element)
}

/// Detector grid: the configured values, falling back to the source grid.
fn detector_geometry(job: &JobConfig, source: &PlanarGeometry) -> Result<PlanarGeometry> {
    let detector = &job.detector;
    let shape = detector.shape.map(|s| s.pair()).unwrap_or(source.shape());
    let spacing = detector.spacing.map(|s| s.pair()).unwrap_or(source.spacing());
    let offset = detector.offset.map(|o| o.pair()).unwrap_or(source.offset());
    PlanarGeometry::new(shape, detector.z, Some(spacing.into()), Some(offset.into())).context("Invalid detector grid")
}

/// Write the detector power map to a CSV file with a metadata header.
pub fn write_reading_csv(reading: &DetectorReading, path: &Path, job: &JobConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::io::BufWriter::new(
        std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
    );

    writeln!(file, "# Wavefront: detector power per cell")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# wavelength: {:e} m", reading.wavelength)?;
    writeln!(file, "# method: {}", reading.method)?;
    for config in &job.elements {
        writeln!(file, "# element {} at z = {}", config.name(), config.z())?;
    }
    writeln!(
        file,
        "# detector: z = {}, shape = {:?}, spacing = {:?}, offset = {:?}",
        reading.z, reading.shape, reading.spacing, reading.offset
    )?;
    writeln!(file, "# total_power: {:.6e}", reading.total_power)?;
    writeln!(file, "#")?;
    writeln!(file, "x_m,y_m,power")?;

    let geometry = PlanarGeometry::new(reading.shape, reading.z, Some(reading.spacing.into()), Some(reading.offset.into()))?;
    let xs = geometry.axis_coords(0);
    let ys = geometry.axis_coords(1);
    for ((i, j), p) in reading.power.indexed_iter() {
        writeln!(file, "{:.6e},{:.6e},{:.6e}", xs[i], ys[j], p)?;
    }
    file.flush()?;

    println!("Detector map written to: {}", path.display());
    Ok(())
}

/// Write the detector reading to a JSON file.
pub fn write_reading_json(reading: &DetectorReading, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(reading).context("JSON serialisation error")?;
    std::fs::write(path, json)?;

    println!("Detector reading (JSON) written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use approx::assert_relative_eq;

    fn gaussian_job(extra: &str) -> JobConfig {
        let text = format!(
            r#"
            [field]
            wavelength = 1e-6
            shape = 48
            spacing = 1e-5
            profile = {{ type = "gaussian", waist_radius = 8e-5 }}

            [detector]
            z = 0.01

            {extra}
            "#
        );
        parse_config(&text).unwrap()
    }

    #[test]
    fn test_free_space_run_conserves_power() {
        let job = gaussian_job("");
        let reading = run_job(&job).unwrap();
        assert_eq!(reading.shape, [48, 48]);
        assert_eq!(reading.z, 0.01);
        assert_eq!(reading.method, "ASM");

        let source = build_source(&job.field, &job, default_backend()).unwrap();
        assert_relative_eq!(reading.total_power, source.power(), max_relative = 1e-3);
        let [cx, cy] = reading.centroid.unwrap();
        assert!(cx.abs() < 1e-9 && cy.abs() < 1e-9);
    }

    #[test]
    fn test_crossed_polarizers_block_light() {
        let text = r#"
            [field]
            wavelength = 1e-6
            shape = 32
            spacing = 1e-5
            polarization = "x"
            profile = { type = "gaussian", waist_radius = 8e-5 }

            [[element]]
            type = "linear_polarizer"
            z = 0.0
            theta = 1.5707963267948966

            [detector]
            z = 0.0
        "#;
        let reading = run_job(&parse_config(text).unwrap()).unwrap();
        assert!(reading.total_power < 1e-20);

        let with_hwp = text.replace(
            "[detector]",
            "[[element]]\ntype = \"half_waveplate\"\nz = 0.0\ntheta = 0.7853981633974483\n\n[detector]",
        );
        let mut job = parse_config(&with_hwp).unwrap();
        job.elements.swap(0, 1);
        let reading = run_job(&job).unwrap();
        let source = build_source(&job.field, &job, default_backend()).unwrap();
        assert_relative_eq!(reading.total_power, source.power(), max_relative = 1e-12);
    }

    #[test]
    fn test_polarization_element_on_scalar_field_fails() {
        let job = gaussian_job(
            r#"
            [[element]]
            type = "quarter_waveplate"
            z = 0.005
            theta = 0.0
            "#,
        );
        let err = run_job(&job).unwrap_err();
        assert!(format!("{err:#}").contains("quarter_waveplate"));
    }

    #[test]
    fn test_validate_rejects_bad_element_parameters() {
        let job = gaussian_job(
            r#"
            [[element]]
            type = "lens"
            z = 0.0
            focal_length = 0.0
            "#,
        );
        assert!(validate_job(&job).is_err());

        let job = gaussian_job(
            r#"
            [[element]]
            type = "aperture"
            z = 0.0
            radius = 1e-4
            size = 2e-4
            "#,
        );
        assert!(validate_job(&job).is_err());
    }

    #[test]
    fn test_jones_vectors_are_normalised() {
        for state in [
            PolarizationState::X,
            PolarizationState::Y,
            PolarizationState::Diagonal,
            PolarizationState::Antidiagonal,
            PolarizationState::Left,
            PolarizationState::Right,
        ] {
            let [ex, ey] = jones_vector(&PolarizationConfig::Named(state));
            assert_relative_eq!(ex.norm_sqr() + ey.norm_sqr(), 1.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_outputs_are_written() {
        let job = gaussian_job(
            r#"
            [[element]]
            type = "aperture"
            z = 0.0
            radius = 1e-4

            [[element]]
            type = "phase_plate"
            z = 0.005
            tilt = [200.0, 0.0]
            "#,
        );
        let reading = run_job(&job).unwrap();
        let dir = std::env::temp_dir().join(format!("wavefront-cli-test-{}", std::process::id()));
        let csv = dir.join("detector.csv");
        let json = dir.join("detector.json");
        write_reading_csv(&reading, &csv, &job).unwrap();
        write_reading_json(&reading, &json).unwrap();

        let text = std::fs::read_to_string(&csv).unwrap();
        assert!(text.starts_with("# Wavefront"));
        assert!(text.contains("# element phase_plate at z = 0.005"));
        let rows = text.lines().filter(|l| !l.starts_with('#')).count();
        assert_eq!(rows, 1 + 48 * 48);

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(value["shape"], serde_json::json!([48, 48]));
        assert_relative_eq!(value["total_power"].as_f64().unwrap(), reading.total_power, max_relative = 1e-12);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
