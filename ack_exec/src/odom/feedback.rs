//! Measured wheel feedback and its reduction to a single rate and angle

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;
use util::maths::RPM_TO_RADS;

// Internal
use crate::loco_ctrl::{
    Quadrant, DRV_LF, DRV_LR, DRV_RF, DRV_RR, NUM_DRV_AXES, NUM_STR_AXES, STR_LF, STR_LR,
    STR_RF, STR_RR,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Feedback from the steered-axle wheels of each side, front first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelFeedback {
    /// Units: revolutions/minute
    pub left_drv_rate_rpm: Vec<f64>,

    /// Units: revolutions/minute
    pub right_drv_rate_rpm: Vec<f64>,

    /// Units: radians
    pub left_str_abs_pos_rad: Vec<f64>,

    /// Units: radians
    pub right_str_abs_pos_rad: Vec<f64>,
}

/// Feedback reduced to a single signed wheel rate and steering angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReducedFeedback {
    /// Units: radians/second
    pub wheel_rate_rads: f64,

    /// Units: radians
    pub str_angle_rad: f64,

    /// Quadrant of the first left wheel's (rate, angle).
    pub quadrant: Quadrant,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum FeedbackError {
    #[error("Expected {expected} {item} values, found {found}")]
    WrongLength {
        item: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Either the left or right wheel rate is invalid for index [{0}]")]
    InvalidRate(usize),

    #[error("Either the left or right steering angle is invalid for index [{0}]")]
    InvalidAngle(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelFeedback {
    /// Build feedback for `wheels_per_side` steered-axle wheels from full axis
    /// arrays, ordered as in `WheelActuatorSetpoint`.
    ///
    /// With one wheel per side only the front wheels are used.
    pub fn from_axes(
        drv_rate_rpm: &[f64; NUM_DRV_AXES],
        str_abs_pos_rad: &[f64; NUM_STR_AXES],
        wheels_per_side: usize,
    ) -> Self {
        let n = wheels_per_side.min(2);
        let take = |front: f64, rear: f64| [front, rear][..n].to_vec();

        Self {
            left_drv_rate_rpm: take(drv_rate_rpm[DRV_LF], drv_rate_rpm[DRV_LR]),
            right_drv_rate_rpm: take(drv_rate_rpm[DRV_RF], drv_rate_rpm[DRV_RR]),
            left_str_abs_pos_rad: take(str_abs_pos_rad[STR_LF], str_abs_pos_rad[STR_LR]),
            right_str_abs_pos_rad: take(str_abs_pos_rad[STR_RF], str_abs_pos_rad[STR_RR]),
        }
    }

    /// Reduce the feedback of `wheels_per_side` wheels to one rate and angle.
    ///
    /// Magnitudes are averaged per side. The rate is the smaller of the two
    /// side means and the angle the larger, so both describe the inner side
    /// of a turn. Signs come from the quadrant of the first left wheel: the
    /// rate is positive when driving forward, the angle when steering
    /// counter-clockwise.
    pub fn reduce(&self, wheels_per_side: usize) -> Result<ReducedFeedback, FeedbackError> {
        let lens = [
            ("left drive rate", self.left_drv_rate_rpm.len()),
            ("right drive rate", self.right_drv_rate_rpm.len()),
            ("left steer angle", self.left_str_abs_pos_rad.len()),
            ("right steer angle", self.right_str_abs_pos_rad.len()),
        ];
        for &(item, found) in lens.iter() {
            if found != wheels_per_side || wheels_per_side == 0 {
                return Err(FeedbackError::WrongLength {
                    item,
                    expected: wheels_per_side,
                    found,
                });
            }
        }

        let mut left_rate_sum = 0.0;
        let mut right_rate_sum = 0.0;
        let mut left_angle_sum = 0.0;
        let mut right_angle_sum = 0.0;

        for i in 0..wheels_per_side {
            let left_rate = self.left_drv_rate_rpm[i] * RPM_TO_RADS;
            let right_rate = self.right_drv_rate_rpm[i] * RPM_TO_RADS;
            let left_angle = self.left_str_abs_pos_rad[i];
            let right_angle = self.right_str_abs_pos_rad[i];

            if !left_rate.is_finite() || !right_rate.is_finite() {
                return Err(FeedbackError::InvalidRate(i));
            }
            if !left_angle.is_finite() || !right_angle.is_finite() {
                return Err(FeedbackError::InvalidAngle(i));
            }

            left_rate_sum += left_rate.abs();
            right_rate_sum += right_rate.abs();
            left_angle_sum += left_angle.abs();
            right_angle_sum += right_angle.abs();
        }

        let n = wheels_per_side as f64;
        let quadrant = Quadrant::classify(
            self.left_drv_rate_rpm[0],
            self.left_str_abs_pos_rad[0],
        );

        Ok(ReducedFeedback {
            wheel_rate_rads: (left_rate_sum / n).min(right_rate_sum / n) * quadrant.drive_sign(),
            str_angle_rad: (left_angle_sum / n).max(right_angle_sum / n) * quadrant.turn_sign(),
            quadrant,
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use util::maths::RADS_TO_RPM;

    fn feedback(left_rads: f64, right_rads: f64, left_rad: f64, right_rad: f64) -> WheelFeedback {
        WheelFeedback {
            left_drv_rate_rpm: vec![left_rads * RADS_TO_RPM; 2],
            right_drv_rate_rpm: vec![right_rads * RADS_TO_RPM; 2],
            // Rear wheels steer opposite to the front
            left_str_abs_pos_rad: vec![left_rad, -left_rad],
            right_str_abs_pos_rad: vec![right_rad, -right_rad],
        }
    }

    #[test]
    fn test_forward_ccw() {
        let r = feedback(4.0, 5.0, 0.3, -0.2).reduce(2).unwrap();

        assert_eq!(r.quadrant, Quadrant::FwdCcw);
        assert!((r.wheel_rate_rads - 4.0).abs() < 1e-9);
        assert!((r.str_angle_rad - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_signs_follow_quadrant() {
        // Forward, clockwise
        let r = feedback(5.0, 4.0, -0.2, 0.3).reduce(2).unwrap();
        assert_eq!(r.quadrant, Quadrant::FwdCw);
        assert!(r.wheel_rate_rads > 0.0);
        assert!(r.str_angle_rad < 0.0);

        // Reverse, left front steered positive
        let r = feedback(-4.0, -5.0, 0.3, -0.2).reduce(2).unwrap();
        assert_eq!(r.quadrant, Quadrant::RevCcw);
        assert!(r.wheel_rate_rads < 0.0);
        assert!(r.str_angle_rad > 0.0);
    }

    #[test]
    fn test_invalid_values() {
        let mut fb = feedback(1.0, 1.0, 0.0, 0.0);
        fb.right_drv_rate_rpm[1] = f64::NAN;
        assert_eq!(fb.reduce(2), Err(FeedbackError::InvalidRate(1)));

        let mut fb = feedback(1.0, 1.0, 0.0, 0.0);
        fb.left_str_abs_pos_rad[0] = f64::NAN;
        assert_eq!(fb.reduce(2), Err(FeedbackError::InvalidAngle(0)));
    }

    #[test]
    fn test_wrong_length() {
        let fb = feedback(1.0, 1.0, 0.0, 0.0);
        assert!(matches!(
            fb.reduce(3),
            Err(FeedbackError::WrongLength { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn test_from_axes() {
        let drv = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let pos = [0.1, 0.2, 0.3, 0.4];

        let fb = WheelFeedback::from_axes(&drv, &pos, 2);
        assert_eq!(fb.left_drv_rate_rpm, vec![1.0, 3.0]);
        assert_eq!(fb.right_drv_rate_rpm, vec![4.0, 6.0]);
        assert_eq!(fb.left_str_abs_pos_rad, vec![0.1, 0.3]);
        assert_eq!(fb.right_str_abs_pos_rad, vec![0.2, 0.4]);

        // One wheel per side keeps the front wheels and reduces cleanly
        let fb = WheelFeedback::from_axes(&drv, &pos, 1);
        assert_eq!(fb.left_drv_rate_rpm, vec![1.0]);
        assert_eq!(fb.right_drv_rate_rpm, vec![4.0]);
        assert_eq!(fb.left_str_abs_pos_rad, vec![0.1]);
        assert_eq!(fb.right_str_abs_pos_rad, vec![0.2]);
        assert!(fb.reduce(1).is_ok());
    }
}
