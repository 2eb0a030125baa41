//! Parameters structure for AckCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
use crate::loco_ctrl::{GeometryError, JointNames, LocoCtrl, VehicleGeometry, WheelParams};
use crate::odom::{OdomError, OdomParams, OdometryEstimator};
use crate::speed_limiter::{AxisLimitParams, LimiterError, SpeedLimiter};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of middle axle drive joints.
const NUM_MIDDLE_WHEELS: usize = 2;

/// Most steered-axle wheels a side can have, one front and one rear.
const MAX_WHEELS_PER_SIDE: usize = 2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the Ackermann controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Commands older than this are replaced by a stop.
    ///
    /// Units: seconds
    #[serde(default = "default_cmd_timeout_s")]
    pub cmd_timeout_s: f64,

    /// Rate at which odometry is published.
    ///
    /// Units: Hertz
    #[serde(default = "default_publish_rate_hz")]
    pub publish_rate_hz: f64,

    /// Output the command after limiting every cycle.
    #[serde(default)]
    pub publish_limited_velocity: bool,

    /// Consecutive faulty cycles tolerated before the controller halts.
    #[serde(default = "default_max_consec_faults")]
    pub max_consec_faults: u32,

    pub wheels: WheelParams,

    pub joints: JointNames,

    #[serde(default)]
    pub odom: OdomParams,

    /// Limits of the linear axis.
    #[serde(default)]
    pub linear: AxisLimitParams,

    /// Limits of the angular axis.
    #[serde(default)]
    pub angular: AxisLimitParams,
}

/// Everything built from a valid set of parameters.
#[derive(Debug, Clone)]
pub(crate) struct Components {
    pub loco_ctrl: LocoCtrl,
    pub linear_limiter: SpeedLimiter,
    pub angular_limiter: SpeedLimiter,
    pub odom: OdometryEstimator,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("Invalid wheel parameters: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Invalid {0} limits: {1}")]
    Limiter(&'static str, LimiterError),

    #[error("Invalid odometry parameters: {0}")]
    Odom(#[from] OdomError),

    #[error("The command timeout must be finite and greater than zero, found {0}")]
    InvalidCmdTimeout(f64),

    #[error("The publish rate must be finite and greater than zero, found {0}")]
    InvalidPublishRate(f64),

    #[error("No wheel joints were given")]
    NoWheelJoints,

    #[error(
        "The number of left wheels ({left}) is different from the number of \
         right wheels ({right})"
    )]
    WheelSideMismatch { left: usize, right: usize },

    #[error("At most 2 wheels per side (front and rear) can be steered, found {0}")]
    TooManyWheels(usize),

    #[error("Expected 2 middle wheel joints, found {0}")]
    MiddleWheelCount(usize),

    #[error(
        "Expected {expected} steering joints per side, found {left} left and \
         {right} right"
    )]
    SteeringCount {
        expected: usize,
        left: usize,
        right: usize,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check every parameter, without keeping anything built from them.
    pub fn validate(&self) -> Result<(), ParamsError> {
        self.build().map(|_| ())
    }

    /// Number of steered-axle wheels on each side.
    pub fn wheels_per_side(&self) -> usize {
        self.joints.left_wheel_names.len()
    }

    /// Publish period.
    ///
    /// Units: seconds
    pub fn publish_period_s(&self) -> f64 {
        1.0 / self.publish_rate_hz
    }

    pub(crate) fn build(&self) -> Result<Components, ParamsError> {
        if !(self.cmd_timeout_s.is_finite() && self.cmd_timeout_s > 0.0) {
            return Err(ParamsError::InvalidCmdTimeout(self.cmd_timeout_s));
        }

        if !(self.publish_rate_hz.is_finite() && self.publish_rate_hz > 0.0) {
            return Err(ParamsError::InvalidPublishRate(self.publish_rate_hz));
        }

        self.validate_joints()?;

        let geom = VehicleGeometry::from_params(&self.wheels, self.wheels_per_side())?;

        Ok(Components {
            loco_ctrl: LocoCtrl::new(geom),
            linear_limiter: SpeedLimiter::new(&self.linear)
                .map_err(|e| ParamsError::Limiter("linear", e))?,
            angular_limiter: SpeedLimiter::new(&self.angular)
                .map_err(|e| ParamsError::Limiter("angular", e))?,
            odom: OdometryEstimator::new(&self.odom, &geom)?,
        })
    }

    fn validate_joints(&self) -> Result<(), ParamsError> {
        let j = &self.joints;
        let left = j.left_wheel_names.len();
        let right = j.right_wheel_names.len();

        if left == 0 {
            return Err(ParamsError::NoWheelJoints);
        }
        if left != right {
            return Err(ParamsError::WheelSideMismatch { left, right });
        }
        if left > MAX_WHEELS_PER_SIDE {
            return Err(ParamsError::TooManyWheels(left));
        }
        if j.middle_wheel_names.len() != NUM_MIDDLE_WHEELS {
            return Err(ParamsError::MiddleWheelCount(j.middle_wheel_names.len()));
        }
        if j.left_steering_names.len() != left || j.right_steering_names.len() != left {
            return Err(ParamsError::SteeringCount {
                expected: left,
                left: j.left_steering_names.len(),
                right: j.right_steering_names.len(),
            });
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn default_cmd_timeout_s() -> f64 {
    0.5
}

fn default_publish_rate_hz() -> f64 {
    50.0
}

fn default_max_consec_faults() -> u32 {
    25
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::odom::{Integration, OdomSource};

    /// A complete, valid parameter file.
    pub(crate) const PARAMS_TOML: &str = r#"
        cmd_timeout_s = 0.5
        publish_rate_hz = 50.0
        publish_limited_velocity = true

        [wheels]
        wheel_separation_m = 0.6
        wheel_base_m = 0.3
        wheel_radius_m = 0.1

        [joints]
        left_wheel_names = ["front_left_wheel", "rear_left_wheel"]
        right_wheel_names = ["front_right_wheel", "rear_right_wheel"]
        middle_wheel_names = ["middle_right_wheel", "middle_left_wheel"]
        left_steering_names = ["front_left_steer", "rear_left_steer"]
        right_steering_names = ["front_right_steer", "rear_right_steer"]

        [odom]
        source = "OpenLoop"
        integration = "Exact"
        velocity_rolling_window_size = 10

        [odom.frames]
        odom_frame_id = "odom"
        base_frame_id = "base_link"
        pose_covariance_diagonal = [0.001, 0.001, 0.001, 0.001, 0.001, 0.01]
        twist_covariance_diagonal = [0.001, 0.001, 0.001, 0.001, 0.001, 0.01]

        [linear]
        has_velocity_limits = true
        max_velocity = 1.0
    "#;

    pub(crate) fn params() -> Params {
        util::params::parse(PARAMS_TOML).unwrap()
    }

    #[test]
    fn test_parse() {
        let p = params();

        assert!(p.validate().is_ok());
        assert_eq!(p.wheels_per_side(), 2);
        assert_eq!(p.odom.source, OdomSource::OpenLoop);
        assert_eq!(p.odom.integration, Integration::Exact);
        assert_eq!(p.odom.frames.pose_covariance_diagonal[5], 0.01);
        assert_eq!(p.max_consec_faults, 25);
        assert!((p.publish_period_s() - 0.02).abs() < 1e-12);
        assert!(!p.angular.has_velocity_limits);
    }

    #[test]
    fn test_invalid_joints() {
        let mut p = params();
        p.joints.right_wheel_names.pop();
        assert_eq!(
            p.validate(),
            Err(ParamsError::WheelSideMismatch { left: 2, right: 1 })
        );

        let mut p = params();
        p.joints.middle_wheel_names.clear();
        assert_eq!(p.validate(), Err(ParamsError::MiddleWheelCount(0)));

        let mut p = params();
        p.joints.left_wheel_names.clear();
        p.joints.right_wheel_names.clear();
        assert_eq!(p.validate(), Err(ParamsError::NoWheelJoints));

        let mut p = params();
        p.joints.left_steering_names.pop();
        assert!(matches!(
            p.validate(),
            Err(ParamsError::SteeringCount { expected: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_values() {
        let mut p = params();
        p.cmd_timeout_s = 0.0;
        assert_eq!(p.validate(), Err(ParamsError::InvalidCmdTimeout(0.0)));

        let mut p = params();
        p.publish_rate_hz = f64::NAN;
        assert!(matches!(
            p.validate(),
            Err(ParamsError::InvalidPublishRate(_))
        ));

        let mut p = params();
        p.angular.has_acceleration_limits = true;
        p.angular.min_acceleration = Some(1.0);
        p.angular.max_acceleration = Some(-1.0);
        assert!(matches!(
            p.validate(),
            Err(ParamsError::Limiter("angular", LimiterError::MinAboveMax(..)))
        ));

        let mut p = params();
        p.odom.velocity_rolling_window_size = 0;
        assert!(matches!(p.validate(), Err(ParamsError::Odom(_))));

        let mut p = params();
        p.wheels.wheel_base_m = -1.0;
        assert!(matches!(p.validate(), Err(ParamsError::Geometry(_))));
    }
}
