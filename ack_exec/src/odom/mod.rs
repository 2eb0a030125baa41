//! # Odometry module
//!
//! Estimates the pose and velocity of the vehicle either from the commanded
//! motion (open loop) or from measured wheel rates and steering angles
//! (closed loop). Closed loop measurements are smoothed with rolling means
//! before being converted into a body velocity.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod feedback;
mod pose;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use util::{
    maths::{guard_divisor, sign},
    rolling_mean::{RollingMeanAccumulator, RollingMeanError},
};

// Internal
use crate::loco_ctrl::VehicleGeometry;
pub use feedback::*;
pub use pose::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Heading increments below this are integrated along a straight line.
const MIN_ARC_HEADING_RAD: f64 = 1e-6;

/// Measured steering angles below this are treated as straight.
const MIN_STEER_ANGLE_RAD: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Odometry parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdomParams {
    #[serde(default)]
    pub source: OdomSource,

    #[serde(default)]
    pub integration: Integration,

    /// Number of samples in the closed loop rolling means.
    #[serde(default = "default_velocity_rolling_window_size")]
    pub velocity_rolling_window_size: usize,

    #[serde(default)]
    pub frames: OdomFrames,
}

/// Geometry the estimator needs to convert wheel feedback to body motion.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OdomGeometry {
    wheel_separation_m: f64,
    wheel_base_m: f64,
    mean_wheel_radius_m: f64,
    steering_angle_correction: f64,
}

/// Pose and velocity estimator.
#[derive(Debug, Clone)]
pub struct OdometryEstimator {
    source: OdomSource,
    integration: Integration,
    geom: OdomGeometry,

    /// Time of the last update.
    ///
    /// Units: seconds
    timestamp_s: f64,

    pose: Pose,
    velocity: VelocityEstimate,

    wheel_rate_acc: RollingMeanAccumulator<f64>,
    str_angle_acc: RollingMeanAccumulator<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the estimator integrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OdomSource {
    /// The limited command.
    OpenLoop,

    /// Measured wheel rates and steering angles.
    ClosedLoop,
}

/// Integration scheme for curved motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Integration {
    /// Exact circular arc, straight line for very small heading increments.
    Exact,

    /// Second order Runge-Kutta.
    RungeKutta2,
}

/// One update of the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OdomInput {
    Cmd { linear_ms: f64, angular_rads: f64 },
    Feedback(ReducedFeedback),
}

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum OdomError {
    #[error("Invalid command for odometry: linear {0} m/s, angular {1} rad/s")]
    InvalidCmd(f64, f64),

    #[error("Invalid feedback for odometry: angle {0} rad, wheel rate {1} rad/s")]
    InvalidFeedback(f64, f64),

    #[error("Update time {now_s} s is before the previous update at {prev_s} s")]
    InvalidTime { now_s: f64, prev_s: f64 },

    #[error("A {0:?} estimator cannot consume this input")]
    InputMismatch(OdomSource),

    #[error("Invalid rolling window: {0}")]
    InvalidWindow(#[from] RollingMeanError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for OdomSource {
    fn default() -> Self {
        OdomSource::ClosedLoop
    }
}

impl Default for Integration {
    fn default() -> Self {
        Integration::Exact
    }
}

impl Default for OdomParams {
    fn default() -> Self {
        Self {
            source: OdomSource::default(),
            integration: Integration::default(),
            velocity_rolling_window_size: default_velocity_rolling_window_size(),
            frames: OdomFrames::default(),
        }
    }
}

impl From<&VehicleGeometry> for OdomGeometry {
    fn from(geom: &VehicleGeometry) -> Self {
        Self {
            wheel_separation_m: geom.wheel_separation_m,
            wheel_base_m: geom.wheel_base_m,
            mean_wheel_radius_m: geom.mean_wheel_radius_m(),
            steering_angle_correction: geom.steering_angle_correction,
        }
    }
}

impl OdometryEstimator {
    /// Create a new estimator at the origin.
    pub fn new(params: &OdomParams, geom: &VehicleGeometry) -> Result<Self, OdomError> {
        let window = params.velocity_rolling_window_size;

        Ok(Self {
            source: params.source,
            integration: params.integration,
            geom: OdomGeometry::from(geom),
            timestamp_s: 0.0,
            pose: Pose::default(),
            velocity: VelocityEstimate::default(),
            wheel_rate_acc: RollingMeanAccumulator::new(window)?,
            str_angle_acc: RollingMeanAccumulator::new(window)?,
        })
    }

    /// Set the time base and clear the rolling means.
    pub fn init(&mut self, time_s: f64) {
        self.reset_accumulators();
        self.timestamp_s = time_s;
    }

    /// Return to the origin at rest, clearing the rolling means.
    pub fn reset_odometry(&mut self) {
        self.pose = Pose::default();
        self.velocity = VelocityEstimate::default();
        self.reset_accumulators();
    }

    /// Update with the input kind the estimator was configured for.
    pub fn update(&mut self, input: &OdomInput, time_s: f64) -> Result<(), OdomError> {
        match (self.source, input) {
            (
                OdomSource::OpenLoop,
                OdomInput::Cmd {
                    linear_ms,
                    angular_rads,
                },
            ) => self.update_open_loop(*linear_ms, *angular_rads, time_s),
            (OdomSource::ClosedLoop, OdomInput::Feedback(fb)) => {
                self.update_vel(fb.str_angle_rad, fb.wheel_rate_rads, time_s)
            }
            (source, _) => Err(OdomError::InputMismatch(source)),
        }
    }

    /// Integrate a commanded body velocity.
    pub fn update_open_loop(
        &mut self,
        linear_ms: f64,
        angular_rads: f64,
        time_s: f64,
    ) -> Result<(), OdomError> {
        if !linear_ms.is_finite() || !angular_rads.is_finite() {
            return Err(OdomError::InvalidCmd(linear_ms, angular_rads));
        }
        let dt_s = self.check_time(time_s)?;

        self.velocity = VelocityEstimate {
            linear_ms,
            angular_rads,
        };
        self.timestamp_s = time_s;
        self.integrate(linear_ms, angular_rads, dt_s);

        Ok(())
    }

    /// Integrate a measured steering angle and wheel rate.
    ///
    /// Both measurements are smoothed by their rolling means. The smoothed
    /// rate is scaled by the mean wheel radius to give the linear speed, and
    /// the smoothed angle, with the steering correction removed, is taken as
    /// the near wheel angle of an Ackermann turn to recover the yaw rate.
    pub fn update_vel(
        &mut self,
        str_angle_rad: f64,
        wheel_rate_rads: f64,
        time_s: f64,
    ) -> Result<(), OdomError> {
        if !str_angle_rad.is_finite() || !wheel_rate_rads.is_finite() {
            return Err(OdomError::InvalidFeedback(str_angle_rad, wheel_rate_rads));
        }
        let dt_s = self.check_time(time_s)?;

        self.wheel_rate_acc.accumulate(wheel_rate_rads);
        self.str_angle_acc.accumulate(str_angle_rad);

        let mean_rate_rads = self.wheel_rate_acc.get_rolling_mean().unwrap_or(0.0);
        let mean_angle_rad = self.str_angle_acc.get_rolling_mean().unwrap_or(0.0);

        let linear_ms = mean_rate_rads * self.geom.mean_wheel_radius_m;
        let angle_rad = mean_angle_rad / guard_divisor(self.geom.steering_angle_correction, 1e-9);

        let angular_rads = if angle_rad.abs() < MIN_STEER_ANGLE_RAD {
            0.0
        } else {
            let curv_radius_m = 0.5
                * (self.geom.wheel_separation_m / angle_rad.abs().tan() + self.geom.wheel_base_m);
            sign(angle_rad) * linear_ms / guard_divisor(curv_radius_m, 1e-9)
        };

        self.velocity = VelocityEstimate {
            linear_ms,
            angular_rads,
        };
        self.timestamp_s = time_s;
        self.integrate(linear_ms, angular_rads, dt_s);

        Ok(())
    }

    /// Update the geometry used by the closed loop path.
    pub fn set_wheel_params(&mut self, geom: &VehicleGeometry) {
        self.geom = OdomGeometry::from(geom);
    }

    /// Resize the rolling means, discarding their samples. The pose is kept.
    pub fn set_velocity_rolling_window_size(&mut self, window_size: usize) -> Result<(), OdomError> {
        self.wheel_rate_acc = RollingMeanAccumulator::new(window_size)?;
        self.str_angle_acc = RollingMeanAccumulator::new(window_size)?;
        Ok(())
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn velocity(&self) -> &VelocityEstimate {
        &self.velocity
    }

    pub fn source(&self) -> OdomSource {
        self.source
    }

    fn reset_accumulators(&mut self) {
        self.wheel_rate_acc.reset();
        self.str_angle_acc.reset();
    }

    /// Period since the last update, rejecting non-finite or backwards time.
    fn check_time(&self, time_s: f64) -> Result<f64, OdomError> {
        let dt_s = time_s - self.timestamp_s;

        if !dt_s.is_finite() || dt_s < 0.0 {
            return Err(OdomError::InvalidTime {
                now_s: time_s,
                prev_s: self.timestamp_s,
            });
        }

        Ok(dt_s)
    }

    fn integrate(&mut self, linear_ms: f64, angular_rads: f64, dt_s: f64) {
        match self.integration {
            Integration::Exact => self.integrate_exact(linear_ms, angular_rads, dt_s),
            Integration::RungeKutta2 => self.integrate_runge_kutta_2(linear_ms, angular_rads, dt_s),
        }

        trace!(
            "Odometry: x {:.4} m, y {:.4} m, heading {:.4} rad",
            self.pose.x_m,
            self.pose.y_m,
            self.pose.heading_rad
        );
    }

    fn integrate_exact(&mut self, linear_ms: f64, angular_rads: f64, dt_s: f64) {
        let d_heading_rad = angular_rads * dt_s;

        if d_heading_rad.abs() < MIN_ARC_HEADING_RAD {
            let (sin_h, cos_h) = self.pose.heading_rad.sin_cos();
            self.pose.x_m += linear_ms * cos_h * dt_s;
            self.pose.y_m += linear_ms * sin_h * dt_s;
            self.pose.heading_rad += d_heading_rad;
        } else {
            let prev_heading_rad = self.pose.heading_rad;
            let radius_m = linear_ms / angular_rads;

            self.pose.heading_rad += d_heading_rad;
            self.pose.x_m += radius_m * (self.pose.heading_rad.sin() - prev_heading_rad.sin());
            self.pose.y_m -= radius_m * (self.pose.heading_rad.cos() - prev_heading_rad.cos());
        }
    }

    fn integrate_runge_kutta_2(&mut self, linear_ms: f64, angular_rads: f64, dt_s: f64) {
        let mid_heading_rad = self.pose.heading_rad + 0.5 * angular_rads * dt_s;

        self.pose.x_m += linear_ms * mid_heading_rad.cos() * dt_s;
        self.pose.y_m += linear_ms * mid_heading_rad.sin() * dt_s;
        self.pose.heading_rad += angular_rads * dt_s;
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn default_velocity_rolling_window_size() -> usize {
    10
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
