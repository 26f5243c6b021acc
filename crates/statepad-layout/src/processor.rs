//! Value processors applied after raw decoding.

use smallvec::SmallVec;
use thiserror::Error;

use crate::format::FormatCode;
use crate::params::{parse_terms_with_delim, split_key_value};
use crate::value::ControlValue;

const DEFAULT_DEADZONE_MIN: f32 = 0.125;
const DEFAULT_DEADZONE_MAX: f32 = 0.925;

#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("{what} near \"{rest}\"")]
    Syntax { what: &'static str, rest: String },
    #[error("unknown parameter \"{0}\"")]
    Unknown(String),
    #[error("parameter \"{key}\" has invalid value \"{value}\"")]
    InvalidValue { key: String, value: String },
    #[error("parameter \"{0}\" requires a value")]
    MissingValue(String),
    #[error("clamp mode {0} is not one of 0, 1, 2, 3")]
    ClampMode(u8),
}

/// Whether inversion mirrors around zero or around one half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvertDomain {
    /// `v -> -v`
    Signed,
    /// `v -> 1 - v`
    Unsigned,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Processor {
    Invert(InvertDomain),
    /// Replaces out-of-range values with `constant` when set, else clamps.
    Clamp {
        min: f32,
        max: f32,
        constant: Option<f32>,
    },
    Normalize {
        min: f32,
        max: f32,
        zero: f32,
    },
    AxisDeadZone {
        min: f32,
        max: f32,
    },
    /// Radial dead zone on the length of a vector.
    StickDeadZone {
        min: f32,
        max: f32,
    },
    Scale(f32),
}

impl Processor {
    pub fn apply(&self, value: ControlValue) -> ControlValue {
        match (self, value) {
            (Processor::StickDeadZone { min, max }, ControlValue::Vector2(x, y)) => {
                let (x, y) = radial_deadzone(x, y, *min, *max);
                ControlValue::Vector2(x, y)
            }
            (_, ControlValue::Scalar(v)) => ControlValue::Scalar(self.apply_scalar(v)),
            (_, ControlValue::Vector2(x, y)) => {
                ControlValue::Vector2(self.apply_scalar(x), self.apply_scalar(y))
            }
        }
    }

    pub fn apply_scalar(&self, v: f32) -> f32 {
        match *self {
            Processor::Invert(InvertDomain::Signed) => -v,
            Processor::Invert(InvertDomain::Unsigned) => 1.0 - v,
            Processor::Clamp { min, max, constant } => match constant {
                Some(c) if v < min || v > max => c,
                _ => v.clamp(min, max),
            },
            Processor::Normalize { min, max, zero } => normalize(v, min, max, zero),
            Processor::AxisDeadZone { min, max } | Processor::StickDeadZone { min, max } => {
                axis_deadzone(v, min, max)
            }
            Processor::Scale(factor) => v * factor,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Processor::Invert(_) => "invert",
            Processor::Clamp { .. } => "clamp",
            Processor::Normalize { .. } => "normalize",
            Processor::AxisDeadZone { .. } => "axisDeadzone",
            Processor::StickDeadZone { .. } => "stickDeadzone",
            Processor::Scale(_) => "scale",
        }
    }
}

fn normalize(v: f32, min: f32, max: f32, zero: f32) -> f32 {
    let zero = zero.max(min);
    if zero > min {
        if v < zero {
            -(zero - v) / (zero - min)
        } else if max > zero {
            (v - zero) / (max - zero)
        } else {
            0.0
        }
    } else if max > min {
        (v - min) / (max - min)
    } else {
        0.0
    }
}

fn axis_deadzone(v: f32, min: f32, max: f32) -> f32 {
    let abs = v.abs();
    if abs < min {
        0.0
    } else if abs > max || max <= min {
        v.signum()
    } else {
        v.signum() * (abs - min) / (max - min)
    }
}

#[inline]
fn magnitude2d(x: f32, y: f32) -> f32 {
    (x * x + y * y).sqrt()
}

fn radial_deadzone(x: f32, y: f32, min: f32, max: f32) -> (f32, f32) {
    let mag = magnitude2d(x, y);
    if mag <= min || mag == 0.0 {
        return (0.0, 0.0);
    }
    let scaled = if max > min {
        ((mag - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        1.0
    };
    (x / mag * scaled, y / mag * scaled)
}

/// Ordered processors of one control.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessorChain(SmallVec<[Processor; 4]>);

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, processor: Processor) -> Self {
        self.0.push(processor);
        self
    }

    pub fn push(&mut self, processor: Processor) {
        self.0.push(processor);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Processor> {
        self.0.iter()
    }

    pub fn apply(&self, value: ControlValue) -> ControlValue {
        self.0.iter().fold(value, |v, p| p.apply(v))
    }

    /// Parses a comma-separated parameter string such as
    /// `"clamp=1,clampMin=-1,clampMax=0,invert"`.
    ///
    /// The resulting chain follows a fixed order regardless of how the
    /// parameters are listed: clamp (modes 1 and 3), normalize, clamp
    /// (mode 2), scale, invert, dead zones.
    pub fn parse(params: &str, format: FormatCode) -> Result<Self, ParameterError> {
        let terms = parse_terms_with_delim(params, ',').map_err(|e| ParameterError::Syntax {
            what: e.kind.describe(),
            rest: e.rest.to_string(),
        })?;

        let mut p = ParsedParams::default();
        for term in terms {
            let (key, value) = split_key_value(term);
            p.set(key, value)?;
        }
        Ok(p.into_chain(format))
    }
}

impl<'a> IntoIterator for &'a ProcessorChain {
    type Item = &'a Processor;
    type IntoIter = std::slice::Iter<'a, Processor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Processor> for ProcessorChain {
    fn from_iter<I: IntoIterator<Item = Processor>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

struct ParsedParams {
    invert: bool,
    clamp: u8,
    clamp_min: f32,
    clamp_max: f32,
    clamp_constant: f32,
    normalize: bool,
    normalize_min: f32,
    normalize_max: f32,
    normalize_zero: f32,
    scale: bool,
    scale_factor: f32,
    deadzone: bool,
    deadzone_min: f32,
    deadzone_max: f32,
    stick_deadzone: bool,
}

impl Default for ParsedParams {
    fn default() -> Self {
        Self {
            invert: false,
            clamp: 0,
            clamp_min: 0.0,
            clamp_max: 0.0,
            clamp_constant: 0.0,
            normalize: false,
            normalize_min: 0.0,
            normalize_max: 0.0,
            normalize_zero: 0.0,
            scale: false,
            scale_factor: 1.0,
            deadzone: false,
            deadzone_min: DEFAULT_DEADZONE_MIN,
            deadzone_max: DEFAULT_DEADZONE_MAX,
            stick_deadzone: false,
        }
    }
}

impl ParsedParams {
    fn set(&mut self, key: &str, value: Option<&str>) -> Result<(), ParameterError> {
        match key {
            "invert" => self.invert = parse_flag(key, value)?,
            "normalize" => self.normalize = parse_flag(key, value)?,
            "scale" => self.scale = parse_flag(key, value)?,
            "axisDeadzone" | "deadzone" => self.deadzone = parse_flag(key, value)?,
            "stickDeadzone" => self.stick_deadzone = parse_flag(key, value)?,
            "clamp" => {
                let raw = require(key, value)?;
                let mode: u8 = raw.parse().map_err(|_| invalid(key, raw))?;
                if mode > 3 {
                    return Err(ParameterError::ClampMode(mode));
                }
                self.clamp = mode;
            }
            "clampMin" => self.clamp_min = parse_float(key, value)?,
            "clampMax" => self.clamp_max = parse_float(key, value)?,
            "clampConstant" => self.clamp_constant = parse_float(key, value)?,
            "normalizeMin" => self.normalize_min = parse_float(key, value)?,
            "normalizeMax" => self.normalize_max = parse_float(key, value)?,
            "normalizeZero" => self.normalize_zero = parse_float(key, value)?,
            "scaleFactor" => self.scale_factor = parse_float(key, value)?,
            "deadzoneMin" => self.deadzone_min = parse_float(key, value)?,
            "deadzoneMax" => self.deadzone_max = parse_float(key, value)?,
            _ => return Err(ParameterError::Unknown(key.to_string())),
        }
        Ok(())
    }

    fn into_chain(self, format: FormatCode) -> ProcessorChain {
        let mut chain = ProcessorChain::new();
        let clamp = Processor::Clamp {
            min: self.clamp_min,
            max: self.clamp_max,
            constant: (self.clamp == 3).then_some(self.clamp_constant),
        };

        if matches!(self.clamp, 1 | 3) {
            chain.push(clamp);
        }
        if self.normalize {
            chain.push(Processor::Normalize {
                min: self.normalize_min,
                max: self.normalize_max,
                zero: self.normalize_zero,
            });
        }
        if self.clamp == 2 {
            chain.push(clamp);
        }
        if self.scale {
            chain.push(Processor::Scale(self.scale_factor));
        }
        if self.invert {
            let centered = self.normalize && self.normalize_zero > self.normalize_min;
            let domain = if format.is_signed() || centered {
                InvertDomain::Signed
            } else {
                InvertDomain::Unsigned
            };
            chain.push(Processor::Invert(domain));
        }
        if self.deadzone {
            chain.push(Processor::AxisDeadZone {
                min: self.deadzone_min,
                max: self.deadzone_max,
            });
        }
        if self.stick_deadzone {
            chain.push(Processor::StickDeadZone {
                min: self.deadzone_min,
                max: self.deadzone_max,
            });
        }
        chain
    }
}

fn invalid(key: &str, value: &str) -> ParameterError {
    ParameterError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn require<'a>(key: &str, value: Option<&'a str>) -> Result<&'a str, ParameterError> {
    value.ok_or_else(|| ParameterError::MissingValue(key.to_string()))
}

fn parse_flag(key: &str, value: Option<&str>) -> Result<bool, ParameterError> {
    match value {
        None => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(invalid(key, v)),
    }
}

fn parse_float(key: &str, value: Option<&str>) -> Result<f32, ParameterError> {
    let raw = require(key, value)?;
    raw.parse::<f32>().map_err(|_| invalid(key, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn chain(params: &str, format: FormatCode) -> ProcessorChain {
        ProcessorChain::parse(params, format).unwrap()
    }

    fn run(chain: &ProcessorChain, v: f32) -> f32 {
        chain.apply(ControlValue::Scalar(v)).as_scalar().unwrap()
    }

    #[test]
    fn invert_domain_follows_format() {
        let signed = chain("invert", FormatCode::Float32);
        assert_eq!(run(&signed, 0.5), -0.5);

        let unsigned = chain("invert", FormatCode::Bit);
        assert_eq!(run(&unsigned, 1.0), 0.0);
        assert_eq!(run(&unsigned, 0.0), 1.0);
    }

    #[test]
    fn invert_false_is_identity() {
        assert!(chain("invert=false", FormatCode::Float32).is_empty());
    }

    #[test]
    fn clamp_with_constant_replaces_out_of_range() {
        // d-pad "left" taken from a hat axis: keep [-1, 0], zero otherwise, flip sign
        let left = chain(
            "clamp=3,clampConstant=0,clampMin=-1,clampMax=0,invert",
            FormatCode::Float32,
        );
        assert_eq!(run(&left, -1.0), 1.0);
        assert_eq!(run(&left, 1.0), 0.0);
        assert_eq!(run(&left, 0.0), 0.0);
    }

    #[test]
    fn canonical_order_is_independent_of_listing() {
        let a = chain("invert,clamp=1,clampMin=-1,clampMax=0", FormatCode::SignedShort);
        let b = chain("clamp=1,clampMin=-1,clampMax=0,invert", FormatCode::SignedShort);
        assert_eq!(a, b);
        assert_eq!(a.iter().next().map(Processor::name), Some("clamp"));
        assert_eq!(run(&a, -0.5), 0.5);
        assert_eq!(run(&a, 0.5), 0.0);
    }

    #[test]
    fn normalize_around_center() {
        let stick = chain(
            "normalize,normalizeMin=0,normalizeMax=1,normalizeZero=0.5",
            FormatCode::UnsignedShort,
        );
        assert!((run(&stick, 0.0) + 1.0).abs() < EPS);
        assert!(run(&stick, 0.5).abs() < EPS);
        assert!((run(&stick, 1.0) - 1.0).abs() < EPS);
    }

    #[test]
    fn inverted_unsigned_stick_half() {
        // clamp to the lower half, center, then mirror around zero
        let left = chain(
            "normalize,normalizeMin=0,normalizeMax=1,normalizeZero=0.5,clamp=1,clampMin=0,clampMax=0.5,invert",
            FormatCode::UnsignedShort,
        );
        assert!((run(&left, 0.0) - 1.0).abs() < EPS);
        assert!(run(&left, 0.5).abs() < EPS);
        assert!(run(&left, 0.9).abs() < EPS);
    }

    #[test]
    fn trigger_normalize_scales_short_range() {
        let trigger = chain(
            "normalize,normalizeMin=0,normalizeMax=0.01560998,normalizeZero=0",
            FormatCode::UnsignedShort,
        );
        let full = 1023.0 / 65535.0;
        assert!((run(&trigger, full) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn axis_deadzone_rescales() {
        let dz = Processor::AxisDeadZone { min: 0.2, max: 0.8 };
        assert_eq!(dz.apply_scalar(0.1), 0.0);
        assert_eq!(dz.apply_scalar(-0.9), -1.0);
        assert!((dz.apply_scalar(0.5) - 0.5).abs() < EPS);
    }

    #[test]
    fn stick_deadzone_is_radial() {
        let dz = Processor::StickDeadZone { min: 0.25, max: 1.0 };
        assert_eq!(
            dz.apply(ControlValue::Vector2(0.1, 0.1)),
            ControlValue::Vector2(0.0, 0.0)
        );
        let out = dz.apply(ControlValue::Vector2(0.0, 1.0));
        assert!(out.approx_eq(&ControlValue::Vector2(0.0, 1.0), EPS));
    }

    #[test]
    fn scale_uses_factor() {
        let s = chain("scale,scaleFactor=2", FormatCode::Float32);
        assert_eq!(run(&s, 0.25), 0.5);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert_eq!(
            ProcessorChain::parse("wobble", FormatCode::Float32),
            Err(ParameterError::Unknown("wobble".to_string()))
        );
        assert_eq!(
            ProcessorChain::parse("clamp=7", FormatCode::Float32),
            Err(ParameterError::ClampMode(7))
        );
        assert!(matches!(
            ProcessorChain::parse("clampMin=abc", FormatCode::Float32),
            Err(ParameterError::InvalidValue { .. })
        ));
        assert!(matches!(
            ProcessorChain::parse("invert,", FormatCode::Float32),
            Err(ParameterError::Syntax { .. })
        ));
        assert_eq!(
            ProcessorChain::parse("clampMax", FormatCode::Float32),
            Err(ParameterError::MissingValue("clampMax".to_string()))
        );
    }
}
