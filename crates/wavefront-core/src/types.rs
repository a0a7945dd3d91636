//! Core types shared across the crate.
//!
//! Scalar-or-pair arguments ([`Vector2`], [`Shape2`]) and the per-field
//! propagation options ([`PropagationOptions`]) with their enumerated
//! settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OpticsError;

/// A pair of `f64` values, one per planar axis.
///
/// Built from a scalar (applied to both axes), an array or a tuple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector2(pub [f64; 2]);

impl From<f64> for Vector2 {
    fn from(v: f64) -> Self {
        Vector2([v, v])
    }
}

impl From<[f64; 2]> for Vector2 {
    fn from(v: [f64; 2]) -> Self {
        Vector2(v)
    }
}

impl From<(f64, f64)> for Vector2 {
    fn from((a, b): (f64, f64)) -> Self {
        Vector2([a, b])
    }
}

/// A pair of grid sizes, one per planar axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape2(pub [usize; 2]);

impl From<usize> for Shape2 {
    fn from(n: usize) -> Self {
        Shape2([n, n])
    }
}

impl From<[usize; 2]> for Shape2 {
    fn from(s: [usize; 2]) -> Self {
        Shape2(s)
    }
}

impl From<(usize, usize)> for Shape2 {
    fn from((a, b): (usize, usize)) -> Self {
        Shape2([a, b])
    }
}

/// Diffraction integral used to carry a field between planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PropagationMethod {
    /// Chooses ASM or DIM per call from the sampling conditions.
    Auto,
    /// Angular spectrum method.
    #[default]
    Asm,
    /// Angular spectrum method with the paraxial transfer function.
    AsmFresnel,
    /// Direct integration of the Rayleigh–Sommerfeld integral.
    Dim,
    /// Direct integration of the Fresnel integral.
    DimFresnel,
    /// Separable single-step Fresnel transform.
    FresnelOneStep,
    /// Two chained single-step Fresnel transforms.
    FresnelTwoStep,
    /// Far-field (Fraunhofer) transform.
    Fraunhofer,
}

impl PropagationMethod {
    pub const ALL: [PropagationMethod; 8] = [
        PropagationMethod::Auto,
        PropagationMethod::Asm,
        PropagationMethod::AsmFresnel,
        PropagationMethod::Dim,
        PropagationMethod::DimFresnel,
        PropagationMethod::FresnelOneStep,
        PropagationMethod::FresnelTwoStep,
        PropagationMethod::Fraunhofer,
    ];

    /// Canonical upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            PropagationMethod::Auto => "AUTO",
            PropagationMethod::Asm => "ASM",
            PropagationMethod::AsmFresnel => "ASM_FRESNEL",
            PropagationMethod::Dim => "DIM",
            PropagationMethod::DimFresnel => "DIM_FRESNEL",
            PropagationMethod::FresnelOneStep => "FRESNEL_ONE_STEP",
            PropagationMethod::FresnelTwoStep => "FRESNEL_TWO_STEP",
            PropagationMethod::Fraunhofer => "FRAUNHOFER",
        }
    }

    /// Whether the method uses the paraxial (Fresnel) approximation.
    pub fn is_paraxial(self) -> bool {
        matches!(
            self,
            PropagationMethod::AsmFresnel
                | PropagationMethod::DimFresnel
                | PropagationMethod::FresnelOneStep
                | PropagationMethod::FresnelTwoStep
                | PropagationMethod::Fraunhofer
        )
    }
}

impl fmt::Display for PropagationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PropagationMethod {
    type Err = OpticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_uppercase().replace('-', "_");
        PropagationMethod::ALL
            .into_iter()
            .find(|m| m.name() == key)
            .ok_or_else(|| OpticsError::InvalidOption {
                kind: "propagation method",
                value: s.to_string(),
                expected: PropagationMethod::ALL.map(|m| m.name()).join(", "),
            })
    }
}

impl TryFrom<String> for PropagationMethod {
    type Error = OpticsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PropagationMethod> for String {
    fn from(m: PropagationMethod) -> Self {
        m.name().to_string()
    }
}

/// Interpolation used when resampling a field onto another grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InterpolationMode {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

impl InterpolationMode {
    pub const ALL: [InterpolationMode; 3] = [
        InterpolationMode::Nearest,
        InterpolationMode::Bilinear,
        InterpolationMode::Bicubic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InterpolationMode::Nearest => "nearest",
            InterpolationMode::Bilinear => "bilinear",
            InterpolationMode::Bicubic => "bicubic",
        }
    }
}

impl fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterpolationMode {
    type Err = OpticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        InterpolationMode::ALL
            .into_iter()
            .find(|m| m.name() == key)
            .ok_or_else(|| OpticsError::InvalidOption {
                kind: "interpolation mode",
                value: s.to_string(),
                expected: InterpolationMode::ALL.map(|m| m.name()).join(", "),
            })
    }
}

impl TryFrom<String> for InterpolationMode {
    type Error = OpticsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<InterpolationMode> for String {
    fn from(m: InterpolationMode) -> Self {
        m.name().to_string()
    }
}

/// Zero padding applied on each side of the grid before the angular
/// spectrum transform, in multiples of the grid size.
///
/// With pad `p` the padded axis holds `(1 + 2p) N` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPadFactor", into = "RawPadFactor")]
pub enum PadFactor {
    Fixed([usize; 2]),
    /// Smallest pad in `1..=4` that satisfies the sampling condition
    /// $(1 + 2p) N \Delta^2 \ge \lambda |\Delta z|$ per axis.
    Auto,
}

impl PadFactor {
    pub const MAX_AUTO: usize = 4;

    /// Resolve to a concrete per-axis pad for one propagation.
    pub fn resolve(self, shape: [usize; 2], spacing: [f64; 2], wavelength: f64, dz: f64) -> [usize; 2] {
        match self {
            PadFactor::Fixed(p) => p,
            PadFactor::Auto => {
                let mut pad = [Self::MAX_AUTO; 2];
                for axis in 0..2 {
                    let n = shape[axis] as f64;
                    let d = spacing[axis];
                    if let Some(p) = (1..=Self::MAX_AUTO)
                        .find(|&p| (1 + 2 * p) as f64 * n * d * d >= wavelength * dz.abs())
                    {
                        pad[axis] = p;
                    }
                }
                pad
            }
        }
    }
}

impl Default for PadFactor {
    fn default() -> Self {
        PadFactor::Fixed([2, 2])
    }
}

impl From<usize> for PadFactor {
    fn from(p: usize) -> Self {
        PadFactor::Fixed([p, p])
    }
}

impl From<[usize; 2]> for PadFactor {
    fn from(p: [usize; 2]) -> Self {
        PadFactor::Fixed(p)
    }
}

impl fmt::Display for PadFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PadFactor::Fixed([a, b]) => write!(f, "({a}, {b})"),
            PadFactor::Auto => f.write_str("auto"),
        }
    }
}

impl FromStr for PadFactor {
    type Err = OpticsError;

    /// Accepts `"auto"`, a single integer or a pair such as `"3, 2"` or `"(3, 2)"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OpticsError::InvalidOption {
            kind: "asm pad factor",
            value: s.to_string(),
            expected: "a non-negative integer, a pair of non-negative integers, or \"auto\"".into(),
        };
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(PadFactor::Auto);
        }
        let inner = trimmed.trim_start_matches(['(', '[']).trim_end_matches([')', ']']);
        let parts = inner
            .split(',')
            .map(|p| p.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        match parts.as_slice() {
            [p] => Ok(PadFactor::Fixed([*p, *p])),
            [a, b] => Ok(PadFactor::Fixed([*a, *b])),
            _ => Err(invalid()),
        }
    }
}

/// Serialised forms of [`PadFactor`]: `2`, `[3, 2]` or `"auto"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawPadFactor {
    Uniform(usize),
    Pair([usize; 2]),
    Name(String),
}

impl TryFrom<RawPadFactor> for PadFactor {
    type Error = OpticsError;

    fn try_from(raw: RawPadFactor) -> Result<Self, Self::Error> {
        match raw {
            RawPadFactor::Uniform(p) => Ok(PadFactor::Fixed([p, p])),
            RawPadFactor::Pair(p) => Ok(PadFactor::Fixed(p)),
            RawPadFactor::Name(s) => s.parse(),
        }
    }
}

impl From<PadFactor> for RawPadFactor {
    fn from(p: PadFactor) -> Self {
        match p {
            PadFactor::Fixed(p) => RawPadFactor::Pair(p),
            PadFactor::Auto => RawPadFactor::Name("auto".into()),
        }
    }
}

/// Per-field propagation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationOptions {
    pub method: PropagationMethod,
    pub interpolation: InterpolationMode,
    pub asm_pad_factor: PadFactor,
}

impl PropagationOptions {
    pub fn with_method(mut self, method: PropagationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_interpolation(mut self, interpolation: InterpolationMode) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_asm_pad_factor(mut self, pad: impl Into<PadFactor>) -> Self {
        self.asm_pad_factor = pad.into();
        self
    }
}
