//! Pose and velocity estimates, and the odometry report published from them

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Planar pose of the vehicle body in the odometry frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x_m: f64,
    pub y_m: f64,

    /// Heading from the odometry frame X axis, counter-clockwise positive.
    /// Not wrapped, so it keeps counting through multiple turns.
    pub heading_rad: f64,
}

/// Instantaneous body velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityEstimate {
    pub linear_ms: f64,
    pub angular_rads: f64,
}

/// Frame names and uncertainties attached to published odometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdomFrames {
    #[serde(default = "default_odom_frame_id")]
    pub odom_frame_id: String,

    #[serde(default = "default_base_frame_id")]
    pub base_frame_id: String,

    /// Diagonal of the pose covariance, ordered x, y, z, roll, pitch, yaw.
    #[serde(default)]
    pub pose_covariance_diagonal: [f64; 6],

    /// Diagonal of the twist covariance, same ordering as the pose.
    #[serde(default)]
    pub twist_covariance_diagonal: [f64; 6],
}

/// Published odometry.
#[derive(Debug, Clone, Serialize)]
pub struct OdomReport {
    pub stamp_s: f64,
    pub odom_frame_id: String,
    pub base_frame_id: String,

    pub position_m: [f64; 2],

    /// Attitude of the body in the odometry frame.
    pub attitude_q: UnitQuaternion<f64>,

    /// Heading wrapped into (-pi, pi].
    pub heading_rad: f64,

    pub velocity: VelocityEstimate,

    pub pose_covariance_diagonal: [f64; 6],
    pub twist_covariance_diagonal: [f64; 6],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Attitude quaternion of the planar heading.
    pub fn attitude_q(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(0.0, 0.0, self.heading_rad)
    }
}

impl Default for OdomFrames {
    fn default() -> Self {
        Self {
            odom_frame_id: default_odom_frame_id(),
            base_frame_id: default_base_frame_id(),
            pose_covariance_diagonal: [0.0; 6],
            twist_covariance_diagonal: [0.0; 6],
        }
    }
}

impl OdomReport {
    pub fn new(stamp_s: f64, pose: &Pose, velocity: &VelocityEstimate, frames: &OdomFrames) -> Self {
        Self {
            stamp_s,
            odom_frame_id: frames.odom_frame_id.clone(),
            base_frame_id: frames.base_frame_id.clone(),
            position_m: [pose.x_m, pose.y_m],
            attitude_q: pose.attitude_q(),
            heading_rad: wrap_pi(pose.heading_rad),
            velocity: *velocity,
            pose_covariance_diagonal: frames.pose_covariance_diagonal,
            twist_covariance_diagonal: frames.twist_covariance_diagonal,
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn default_odom_frame_id() -> String {
    String::from("odom")
}

fn default_base_frame_id() -> String {
    String::from("base_link")
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
