//! # Simulated Mechanisms
//!
//! A stand-in for the wheel actuators when no hardware is attached. Each axis
//! follows its demand with a first order lag, and the axis states are
//! reported back as wheel feedback for closed loop odometry.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::loco_ctrl::{WheelActuatorSetpoint, NUM_DRV_AXES, NUM_STR_AXES};
use crate::odom::WheelFeedback;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated actuators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimMechParams {
    /// Time constant of the drive axes.
    ///
    /// Units: seconds
    #[serde(default = "default_drv_time_const_s")]
    pub drv_time_const_s: f64,

    /// Time constant of the steer axes.
    ///
    /// Units: seconds
    #[serde(default = "default_str_time_const_s")]
    pub str_time_const_s: f64,
}

/// Simulated actuators.
#[derive(Debug, Clone)]
pub struct SimMech {
    params: SimMechParams,

    /// Steered-axle wheels reported per side.
    wheels_per_side: usize,

    /// Actuator states, in the same units and order as the setpoint sent to
    /// the hardware.
    drv_rate_rpm: [f64; NUM_DRV_AXES],
    str_abs_pos_rad: [f64; NUM_STR_AXES],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimMechParams {
    fn default() -> Self {
        Self {
            drv_time_const_s: default_drv_time_const_s(),
            str_time_const_s: default_str_time_const_s(),
        }
    }
}

impl SimMech {
    /// Create a new simulation with every axis at rest, reporting feedback for
    /// `wheels_per_side` steered-axle wheels.
    pub fn new(params: SimMechParams, wheels_per_side: usize) -> Self {
        Self {
            params,
            wheels_per_side,
            drv_rate_rpm: [0.0; NUM_DRV_AXES],
            str_abs_pos_rad: [0.0; NUM_STR_AXES],
        }
    }

    /// Move every axis towards the setpoint over `dt_s`.
    ///
    /// Non-finite demands are ignored and the axis holds its state.
    pub fn step(&mut self, setpoint: &WheelActuatorSetpoint, dt_s: f64) {
        if !(dt_s.is_finite() && dt_s > 0.0) {
            return;
        }

        let drv_gain = lag_gain(self.params.drv_time_const_s, dt_s);
        let str_gain = lag_gain(self.params.str_time_const_s, dt_s);

        for (state, dem) in self.drv_rate_rpm.iter_mut().zip(setpoint.drv_rate_rpm().iter()) {
            if dem.is_finite() {
                *state += (dem - *state) * drv_gain;
            }
        }

        for (state, dem) in self
            .str_abs_pos_rad
            .iter_mut()
            .zip(setpoint.str_abs_pos_rad.iter())
        {
            if dem.is_finite() {
                *state += (dem - *state) * str_gain;
            }
        }
    }

    /// Current axis states as wheel feedback.
    pub fn feedback(&self) -> WheelFeedback {
        WheelFeedback::from_axes(
            &self.drv_rate_rpm,
            &self.str_abs_pos_rad,
            self.wheels_per_side,
        )
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Fraction of the error removed in one step of a discrete first order lag.
///
/// A zero time constant follows the demand exactly.
fn lag_gain(time_const_s: f64, dt_s: f64) -> f64 {
    if time_const_s <= 0.0 {
        1.0
    } else {
        1.0 - (-dt_s / time_const_s).exp()
    }
}

fn default_drv_time_const_s() -> f64 {
    0.1
}

fn default_str_time_const_s() -> f64 {
    0.05
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
