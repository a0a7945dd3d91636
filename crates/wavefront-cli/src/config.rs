//! TOML configuration deserialisation for propagation jobs.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use wavefront_core::types::{PropagationOptions, Shape2, Vector2};

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub field: FieldConfig,
    #[serde(default)]
    pub propagation: PropagationOptions,
    #[serde(default)]
    pub compute: ComputeConfig,
    #[serde(default, rename = "element")]
    pub elements: Vec<ElementConfig>,
    pub detector: DetectorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Either a single value used on both axes or an explicit `[x, y]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PerAxis<T> {
    Uniform(T),
    Pair([T; 2]),
}

impl<T: Copy> PerAxis<T> {
    pub fn pair(self) -> [T; 2] {
        match self {
            PerAxis::Uniform(v) => [v, v],
            PerAxis::Pair(p) => p,
        }
    }
}

impl From<PerAxis<f64>> for Vector2 {
    fn from(v: PerAxis<f64>) -> Self {
        Vector2(v.pair())
    }
}

impl From<PerAxis<usize>> for Shape2 {
    fn from(v: PerAxis<usize>) -> Self {
        Shape2(v.pair())
    }
}

/// Source field on its initial plane.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    /// Wavelength in metres.
    pub wavelength: f64,
    pub shape: PerAxis<usize>,
    pub spacing: PerAxis<f64>,
    #[serde(default)]
    pub z: f64,
    #[serde(default = "default_offset")]
    pub offset: PerAxis<f64>,
    /// Jones vector of a polarized source. A scalar field is built when absent.
    #[serde(default)]
    pub polarization: Option<PolarizationConfig>,
    pub profile: ProfileConfig,
}

fn default_offset() -> PerAxis<f64> {
    PerAxis::Uniform(0.0)
}

/// Transverse polarization state: a named state or a real `[Ex, Ey]` pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PolarizationConfig {
    Named(PolarizationState),
    Jones([f64; 2]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolarizationState {
    X,
    Y,
    Diagonal,
    Antidiagonal,
    Left,
    Right,
}

/// Analytic initial profile, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ProfileConfig {
    Gaussian { waist_radius: f64 },
    HermiteGaussian { m: u32, n: u32, waist_radius: f64 },
    Circle { radius: f64 },
    Rectangle { size: PerAxis<f64> },
    Uniform,
}

/// Compute backend settings.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputeConfig {
    /// Worker threads for the CPU backend. Uses the shared default backend when absent.
    #[serde(default)]
    pub threads: Option<usize>,
}

/// An element placed on the source grid at plane `z`, tagged by `type`.
/// Angles are in radians.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ElementConfig {
    Lens {
        z: f64,
        focal_length: f64,
        #[serde(default = "default_true")]
        circular: bool,
    },
    /// Binary amplitude mask: a circle of `radius` or a rectangle of `size`.
    Aperture {
        z: f64,
        #[serde(default)]
        radius: Option<f64>,
        #[serde(default)]
        size: Option<PerAxis<f64>>,
    },
    /// Phase `phase + tilt[0]·x + tilt[1]·y`, with the tilt in rad/m.
    PhasePlate {
        z: f64,
        #[serde(default)]
        phase: f64,
        #[serde(default)]
        tilt: [f64; 2],
    },
    LinearPolarizer { z: f64, theta: f64 },
    CircularPolarizer { z: f64, handedness: HandednessConfig },
    Waveplate { z: f64, phi: f64, theta: f64 },
    QuarterWaveplate { z: f64, theta: f64 },
    HalfWaveplate { z: f64, theta: f64 },
}

impl ElementConfig {
    pub fn z(&self) -> f64 {
        match *self {
            ElementConfig::Lens { z, .. }
            | ElementConfig::Aperture { z, .. }
            | ElementConfig::PhasePlate { z, .. }
            | ElementConfig::LinearPolarizer { z, .. }
            | ElementConfig::CircularPolarizer { z, .. }
            | ElementConfig::Waveplate { z, .. }
            | ElementConfig::QuarterWaveplate { z, .. }
            | ElementConfig::HalfWaveplate { z, .. } => z,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementConfig::Lens { .. } => "lens",
            ElementConfig::Aperture { .. } => "aperture",
            ElementConfig::PhasePlate { .. } => "phase_plate",
            ElementConfig::LinearPolarizer { .. } => "linear_polarizer",
            ElementConfig::CircularPolarizer { .. } => "circular_polarizer",
            ElementConfig::Waveplate { .. } => "waveplate",
            ElementConfig::QuarterWaveplate { .. } => "quarter_waveplate",
            ElementConfig::HalfWaveplate { .. } => "half_waveplate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandednessConfig {
    Left,
    Right,
}

/// Detector plane. Grid settings default to those of the source field.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    pub z: f64,
    #[serde(default)]
    pub shape: Option<PerAxis<usize>>,
    #[serde(default)]
    pub spacing: Option<PerAxis<f64>>,
    #[serde(default)]
    pub offset: Option<PerAxis<f64>>,
}

/// Output configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to also save the detector reading as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}

fn default_true() -> bool {
    true
}

/// Parse a job from TOML text.
pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    toml::from_str(content).context("Invalid job configuration")
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("In {}", path.display()))
}
