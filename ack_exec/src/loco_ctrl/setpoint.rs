//! Wheel actuator setpoints produced by LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use util::maths::RADS_TO_RPM;

// Internal
use super::{NUM_DRV_AXES, NUM_STR_AXES};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Drive axis indices
pub const DRV_LF: usize = 0;
pub const DRV_LM: usize = 1;
pub const DRV_LR: usize = 2;
pub const DRV_RF: usize = 3;
pub const DRV_RM: usize = 4;
pub const DRV_RR: usize = 5;

/// Steer axis indices
pub const STR_LF: usize = 0;
pub const STR_RF: usize = 1;
pub const STR_LR: usize = 2;
pub const STR_RR: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Demands for every actuated axis of the vehicle for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelActuatorSetpoint {
    /// Drive axis rate demands, ordered LF, LM, LR, RF, RM, RR.
    ///
    /// Units: radians/second
    pub drv_rate_rads: [f64; NUM_DRV_AXES],

    /// Steer axis absolute position demands, ordered LF, RF, LR, RR.
    ///
    /// Units: radians
    pub str_abs_pos_rad: [f64; NUM_STR_AXES],
}

/// Names of the actuated joints, used to label setpoints for the hardware.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JointNames {
    /// Steered-axle drive joints on the left, front first.
    pub left_wheel_names: Vec<String>,

    /// Steered-axle drive joints on the right, front first.
    pub right_wheel_names: Vec<String>,

    /// Middle axle drive joints, right first.
    pub middle_wheel_names: Vec<String>,

    /// Left steering joints, front first.
    pub left_steering_names: Vec<String>,

    /// Right steering joints, front first.
    pub right_steering_names: Vec<String>,
}

/// Setpoint labelled with joint names, in hardware units.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JointDemands {
    /// Units: revolutions/minute
    pub drv_rate_rpm: Vec<(String, f64)>,

    /// Units: radians
    pub str_abs_pos_rad: Vec<(String, f64)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelActuatorSetpoint {
    /// A setpoint with every rate and angle zero.
    pub fn halt() -> Self {
        Self::default()
    }

    pub fn is_halt(&self) -> bool {
        self.drv_rate_rads.iter().all(|r| *r == 0.0)
            && self.str_abs_pos_rad.iter().all(|p| *p == 0.0)
    }

    /// Drive rates converted to revolutions per minute.
    pub fn drv_rate_rpm(&self) -> [f64; NUM_DRV_AXES] {
        let mut rpm = [0.0; NUM_DRV_AXES];
        for (out, rads) in rpm.iter_mut().zip(self.drv_rate_rads.iter()) {
            *out = rads * RADS_TO_RPM;
        }
        rpm
    }

    /// Label the setpoint with joint names.
    ///
    /// Joints missing from `joints` are skipped.
    pub fn to_joint_demands(&self, joints: &JointNames) -> JointDemands {
        let rpm = self.drv_rate_rpm();
        let mut demands = JointDemands::default();

        let label = |names: &[String], values: &[f64], out: &mut Vec<(String, f64)>| {
            for (name, value) in names.iter().zip(values.iter()) {
                out.push((name.clone(), *value));
            }
        };

        label(
            &joints.left_wheel_names,
            &[rpm[DRV_LF], rpm[DRV_LR]],
            &mut demands.drv_rate_rpm,
        );
        label(
            &joints.right_wheel_names,
            &[rpm[DRV_RF], rpm[DRV_RR]],
            &mut demands.drv_rate_rpm,
        );
        label(
            &joints.middle_wheel_names,
            &[rpm[DRV_RM], rpm[DRV_LM]],
            &mut demands.drv_rate_rpm,
        );
        label(
            &joints.left_steering_names,
            &[self.str_abs_pos_rad[STR_LF], self.str_abs_pos_rad[STR_LR]],
            &mut demands.str_abs_pos_rad,
        );
        label(
            &joints.right_steering_names,
            &[self.str_abs_pos_rad[STR_RF], self.str_abs_pos_rad[STR_RR]],
            &mut demands.str_abs_pos_rad,
        );

        demands
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_halt() {
        let sp = WheelActuatorSetpoint::halt();
        assert!(sp.is_halt());
        assert_eq!(sp.drv_rate_rpm(), [0.0; NUM_DRV_AXES]);
    }

    #[test]
    fn test_joint_labels() {
        let joints = JointNames {
            left_wheel_names: names(&["fl", "rl"]),
            right_wheel_names: names(&["fr", "rr"]),
            middle_wheel_names: names(&["mr", "ml"]),
            left_steering_names: names(&["fl_str", "rl_str"]),
            right_steering_names: names(&["fr_str", "rr_str"]),
        };

        let mut sp = WheelActuatorSetpoint::halt();
        sp.drv_rate_rads[DRV_LM] = std::f64::consts::TAU;
        sp.str_abs_pos_rad[STR_RR] = 0.25;

        let d = sp.to_joint_demands(&joints);

        assert_eq!(d.drv_rate_rpm.len(), 6);
        assert_eq!(d.str_abs_pos_rad.len(), 4);

        let ml = d.drv_rate_rpm.iter().find(|(n, _)| n == "ml").unwrap().1;
        assert!((ml - 60.0).abs() < 1e-9);

        assert_eq!(d.str_abs_pos_rad[3], ("rr_str".to_string(), 0.25));
    }
}
