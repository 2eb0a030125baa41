//! Commands passed into LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A body frame motion command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TwistCommand {
    /// Forward speed of the vehicle body, forward positive.
    ///
    /// Units: meters/second
    pub linear_ms: f64,

    /// Yaw rate of the vehicle body, counter-clockwise positive.
    ///
    /// Units: radians/second
    pub angular_rads: f64,

    /// Session time at which the command was issued. A zero stamp means
    /// "unstamped" and is replaced by the receiving boundary.
    ///
    /// Units: seconds
    #[serde(default)]
    pub stamp_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TwistCommand {
    pub fn new(linear_ms: f64, angular_rads: f64, stamp_s: f64) -> Self {
        Self {
            linear_ms,
            angular_rads,
            stamp_s,
        }
    }

    /// A stop command issued at the given time.
    pub fn zero(stamp_s: f64) -> Self {
        Self::new(0.0, 0.0, stamp_s)
    }

    /// Returns true if both rates are finite.
    pub fn is_finite(&self) -> bool {
        self.linear_ms.is_finite() && self.angular_rads.is_finite()
    }

    /// Returns true if the command demands a turn about a point with no
    /// forward motion, which the Ackermann geometry cannot produce.
    pub fn has_undefined_turn(&self) -> bool {
        self.angular_rads != 0.0 && self.linear_ms == 0.0
    }

    /// Age of the command at `now_s`.
    pub fn age_s(&self, now_s: f64) -> f64 {
        now_s - self.stamp_s
    }
}
