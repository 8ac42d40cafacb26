//! Core data types shared across the excitation crates.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// AngleUnit
// ---------------------------------------------------------------------------

/// Unit used at the public boundary of trajectory queries.
///
/// Internal math is always in radians; conversion happens only when values
/// enter (offsets) or leave (angle, velocity, acceleration) a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnit {
    #[default]
    Radians,
    Degrees,
}

impl AngleUnit {
    /// Build from the classic `use_degrees` flag.
    pub const fn from_degrees_flag(use_degrees: bool) -> Self {
        if use_degrees { Self::Degrees } else { Self::Radians }
    }

    /// Convert a value given in this unit to radians.
    pub fn to_radians(self, value: f64) -> f64 {
        match self {
            Self::Radians => value,
            Self::Degrees => value.to_radians(),
        }
    }

    /// Convert a radian-based value to this unit.
    pub fn from_radians(self, value: f64) -> f64 {
        match self {
            Self::Radians => value,
            Self::Degrees => value.to_degrees(),
        }
    }
}

// ---------------------------------------------------------------------------
// JointLimits
// ---------------------------------------------------------------------------

/// Physical limits of one actuated joint, radian based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub name: String,
    /// Lower position limit (rad).
    pub lower: f64,
    /// Upper position limit (rad).
    pub upper: f64,
    /// Maximum absolute velocity (rad/s).
    pub velocity: f64,
    /// Maximum absolute torque (Nm).
    pub torque: f64,
}

impl JointLimits {
    pub fn new(name: impl Into<String>, lower: f64, upper: f64, velocity: f64, torque: f64) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
            velocity,
            torque,
        }
    }

    /// Check that the limits describe a usable joint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all_finite = [self.lower, self.upper, self.velocity, self.torque]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(ConfigError::invalid(
                format!("joints.{}", self.name),
                "limits must be finite",
            ));
        }
        if self.lower > self.upper {
            return Err(ConfigError::InvalidBounds {
                field: format!("joints.{}", self.name),
                low: self.lower,
                high: self.upper,
            });
        }
        if self.velocity <= 0.0 || self.torque <= 0.0 {
            return Err(ConfigError::invalid(
                format!("joints.{}", self.name),
                "velocity and torque limits must be > 0",
            ));
        }
        Ok(())
    }
}

/// Supplier of per-joint limits. Read once before an optimization run.
pub trait JointLimitsSource {
    fn joint_limits(&self) -> Result<Vec<JointLimits>, ConfigError>;
}

impl JointLimitsSource for Vec<JointLimits> {
    fn joint_limits(&self) -> Result<Vec<JointLimits>, ConfigError> {
        Ok(self.clone())
    }
}

impl JointLimitsSource for [JointLimits] {
    fn joint_limits(&self) -> Result<Vec<JointLimits>, ConfigError> {
        Ok(self.to_vec())
    }
}

// ---------------------------------------------------------------------------
// ParameterRange / ParameterBounds
// ---------------------------------------------------------------------------

/// Closed interval `[low, high]`, serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ParameterRange {
    pub low: f64,
    pub high: f64,
}

impl ParameterRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.low).min(self.high)
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if !self.low.is_finite() || !self.high.is_finite() || self.low > self.high {
            return Err(ConfigError::InvalidBounds {
                field: field.to_string(),
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }
}

impl From<[f64; 2]> for ParameterRange {
    fn from([low, high]: [f64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<ParameterRange> for [f64; 2] {
    fn from(range: ParameterRange) -> Self {
        [range.low, range.high]
    }
}

const fn default_pulsation_range() -> ParameterRange {
    ParameterRange::new(0.2, 2.0)
}
const fn default_offset_range() -> ParameterRange {
    ParameterRange::new(-1.0, 1.0)
}
const fn default_coefficient_range() -> ParameterRange {
    ParameterRange::new(-1.0, 1.0)
}

/// Per-class bounds on the trajectory parameters.
///
/// One range per class, shared by every DOF and harmonic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds {
    /// Global pulsation `w_f` (rad/s).
    #[serde(default = "default_pulsation_range")]
    pub pulsation: ParameterRange,
    /// Joint offsets `q0` (rad).
    #[serde(default = "default_offset_range")]
    pub offset: ParameterRange,
    /// Sine coefficients `a`.
    #[serde(default = "default_coefficient_range")]
    pub sine: ParameterRange,
    /// Cosine coefficients `b`.
    #[serde(default = "default_coefficient_range")]
    pub cosine: ParameterRange,
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            pulsation: default_pulsation_range(),
            offset: default_offset_range(),
            sine: default_coefficient_range(),
            cosine: default_coefficient_range(),
        }
    }
}

impl ParameterBounds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pulsation.validate("bounds.pulsation")?;
        self.offset.validate("bounds.offset")?;
        self.sine.validate("bounds.sine")?;
        self.cosine.validate("bounds.cosine")?;
        if self.pulsation.low <= 0.0 {
            return Err(ConfigError::invalid(
                "bounds.pulsation",
                "lower pulsation bound must be > 0",
            ));
        }
        Ok(())
    }
}
