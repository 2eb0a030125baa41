//! # Speed limiter module
//!
//! Bounds the velocity, acceleration and jerk of a single command axis
//! (linear or angular) so that demands handed to the kinematics are
//! physically realisable. Acceleration and jerk are estimated by finite
//! differences over the two previously applied values, assuming every period
//! equals the current one.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod history;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;
use util::maths::clamp;

// Internal
pub use history::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits of one axis as configured.
///
/// A missing minimum defaults to the negated maximum. Units are those of the
/// axis (m/s or rad/s for velocity, per second and per second squared for
/// acceleration and jerk).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AxisLimitParams {
    #[serde(default)]
    pub has_velocity_limits: bool,
    #[serde(default)]
    pub min_velocity: Option<f64>,
    #[serde(default)]
    pub max_velocity: Option<f64>,

    #[serde(default)]
    pub has_acceleration_limits: bool,
    #[serde(default)]
    pub min_acceleration: Option<f64>,
    #[serde(default)]
    pub max_acceleration: Option<f64>,

    #[serde(default)]
    pub has_jerk_limits: bool,
    #[serde(default)]
    pub min_jerk: Option<f64>,
    #[serde(default)]
    pub max_jerk: Option<f64>,
}

/// Validated, inclusive bounds of one quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

/// Velocity, acceleration and jerk limiter for a single axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeedLimiter {
    velocity: Option<Bounds>,
    acceleration: Option<Bounds>,
    jerk: Option<Bounds>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum LimiterError {
    #[error("The {0} limit is enabled but has no maximum")]
    MissingMax(&'static str),

    #[error("The {0} limit bounds must be finite, found [{1}, {2}]")]
    NonFinite(&'static str, f64, f64),

    #[error("The {0} limit minimum ({1}) is greater than its maximum ({2})")]
    MinAboveMax(&'static str, f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Bounds {
    fn from_params(
        name: &'static str,
        enabled: bool,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Option<Self>, LimiterError> {
        if !enabled {
            return Ok(None);
        }

        let max = max.ok_or(LimiterError::MissingMax(name))?;
        let min = min.unwrap_or(-max);

        if !min.is_finite() || !max.is_finite() {
            return Err(LimiterError::NonFinite(name, min, max));
        }

        if min > max {
            return Err(LimiterError::MinAboveMax(name, min, max));
        }

        Ok(Some(Self { min, max }))
    }

    fn clamp(&self, value: f64) -> f64 {
        clamp(&value, &self.min, &self.max)
    }
}

impl SpeedLimiter {
    /// Build a limiter from the configured limits of one axis.
    pub fn new(params: &AxisLimitParams) -> Result<Self, LimiterError> {
        Ok(Self {
            velocity: Bounds::from_params(
                "velocity",
                params.has_velocity_limits,
                params.min_velocity,
                params.max_velocity,
            )?,
            acceleration: Bounds::from_params(
                "acceleration",
                params.has_acceleration_limits,
                params.min_acceleration,
                params.max_acceleration,
            )?,
            jerk: Bounds::from_params(
                "jerk",
                params.has_jerk_limits,
                params.min_jerk,
                params.max_jerk,
            )?,
        })
    }

    /// Returns true if any of the limits is enabled.
    pub fn is_enabled(&self) -> bool {
        self.velocity.is_some() || self.acceleration.is_some() || self.jerk.is_some()
    }

    /// Limit `value` in place given the two previously applied values `v0`
    /// (most recent) and `v1`, and the period `dt_s` since `v0` was applied.
    ///
    /// Returns the applied scale `limited / requested`, or 1 if the request
    /// was zero.
    ///
    /// The velocity bound is applied first, then acceleration, then jerk.
    /// Acceleration and velocity are bounded again after the jerk stage so the
    /// result always respects them.
    ///
    /// If any limit is enabled and `dt_s` is not a positive finite number the
    /// previous value is held.
    pub fn limit(&self, value: &mut f64, v0: f64, v1: f64, dt_s: f64) -> f64 {
        let requested = *value;

        if !self.is_enabled() {
            return 1.0;
        }

        if !(dt_s.is_finite() && dt_s > 0.0) {
            *value = v0;
            return scale(requested, *value);
        }

        if let Some(b) = self.velocity {
            *value = b.clamp(*value);
        }

        if let Some(b) = self.acceleration {
            let acc = (*value - v0) / dt_s;
            *value = v0 + b.clamp(acc) * dt_s;
        }

        if let Some(b) = self.jerk {
            let acc = (*value - v0) / dt_s;
            let prev_acc = (v0 - v1) / dt_s;
            let jerk = (acc - prev_acc) / dt_s;

            *value = v0 + (prev_acc + b.clamp(jerk) * dt_s) * dt_s;

            // Bounding the jerk can undo the earlier stages
            if let Some(b) = self.acceleration {
                let acc = (*value - v0) / dt_s;
                *value = v0 + b.clamp(acc) * dt_s;
            }
            if let Some(b) = self.velocity {
                *value = b.clamp(*value);
            }
        }

        scale(requested, *value)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn scale(requested: f64, limited: f64) -> f64 {
    if requested != 0.0 {
        limited / requested
    } else {
        1.0
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
