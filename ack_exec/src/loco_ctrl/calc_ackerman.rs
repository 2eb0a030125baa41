//! Ackermann manouvre calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::trace;
use std::f64::consts::FRAC_PI_2;
use util::maths::guard_divisor;

// Internal imports
use super::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Smallest magnitude allowed for `sin(steer angle)` when computing the
/// distance from a steered wheel to the centre of rotation.
const MIN_ABS_SIN: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Locomotion control, the inverse kinematics of the vehicle.
#[derive(Debug, Clone)]
pub struct LocoCtrl {
    geom: VehicleGeometry,
}

/// Unsigned rates and angles of the near and far sides of a manouvre.
#[derive(Debug, Clone, Copy, Default)]
struct SideMagnitudes {
    str_near_rad: f64,
    str_far_rad: f64,
    drv_near_rads: f64,
    drv_far_rads: f64,
    drv_mid_near_rads: f64,
    drv_mid_far_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocoCtrl {
    pub fn new(geom: VehicleGeometry) -> Self {
        Self { geom }
    }

    /// Perform the ackerman command calculations.
    ///
    /// The Ackerman manouvre is described in
    /// https://en.wikipedia.org/wiki/Ackermann_steering_geometry, and involves
    /// the vehicle pivoting about a point known as the centre of rotation.
    /// The radius of the turn is `|linear / angular|`, the front and rear
    /// axles steer symmetrically about the middle axle.
    ///
    /// Commands with a yaw rate but no forward speed have no defined turning
    /// radius and are rejected.
    pub fn calc_ackerman(&self, cmd: &TwistCommand) -> Result<WheelActuatorSetpoint, LocoCtrlError> {
        if !cmd.is_finite() {
            return Err(LocoCtrlError::InvalidCmd(*cmd));
        }

        if cmd.has_undefined_turn() {
            return Err(LocoCtrlError::UndefinedTurningRadius {
                angular_rads: cmd.angular_rads,
            });
        }

        let curv_m = (cmd.angular_rads / cmd.linear_ms).abs();
        let curv_radius_m = (cmd.linear_ms / cmd.angular_rads).abs();

        // Very gentle turns are driven straight, which also covers the zero
        // rate case where the radius is infinite.
        let (quadrant, mags) = if cmd.angular_rads == 0.0
            || curv_m < self.geom.min_curvature_m
            || !curv_radius_m.is_finite()
        {
            (
                Quadrant::classify(cmd.linear_ms, 0.0),
                self.calc_ackerman_straight(cmd.linear_ms),
            )
        } else {
            (
                Quadrant::classify(cmd.linear_ms, cmd.angular_rads),
                self.calc_ackerman_generic(cmd.angular_rads, curv_radius_m),
            )
        };

        let setpoint = self.apply_quadrant(quadrant, &mags);

        trace!(
            "Ackerman {:?}: drv {:?} rad/s, str {:?} rad",
            quadrant,
            setpoint.drv_rate_rads,
            setpoint.str_abs_pos_rad
        );

        Ok(setpoint)
    }

    /// Calculate the magnitudes for a straight drive.
    ///
    /// Near is taken as the left side, which is the case for both straight
    /// quadrants.
    fn calc_ackerman_straight(&self, speed_ms: f64) -> SideMagnitudes {
        let left_rads = (speed_ms / self.geom.left_wheel_radius_m).abs();
        let right_rads = (speed_ms / self.geom.right_wheel_radius_m).abs();

        SideMagnitudes {
            str_near_rad: 0.0,
            str_far_rad: 0.0,
            drv_near_rads: left_rads,
            drv_far_rads: right_rads,
            drv_mid_near_rads: left_rads,
            drv_mid_far_rads: right_rads,
        }
    }

    /// Calculate the magnitudes for a turn of the given radius.
    ///
    /// The near side rates are scaled by the left wheel radius and the far
    /// side by the right wheel radius, whichever physical side they end up
    /// on.
    fn calc_ackerman_generic(&self, angular_rads: f64, curv_radius_m: f64) -> SideMagnitudes {
        let base_m = self.geom.wheel_base_m;
        let sep_m = self.geom.wheel_separation_m;
        let comp = self.geom.angular_velocity_compensation;

        let str_near_rad = FRAC_PI_2 - ((2.0 * curv_radius_m - base_m) / sep_m).atan();
        let str_far_rad = FRAC_PI_2 - ((2.0 * curv_radius_m + base_m) / sep_m).atan();

        // Distance from each steered wheel to the centre of rotation
        let near_axis_m = (sep_m / (2.0 * guard_divisor(str_near_rad.sin(), MIN_ABS_SIN))).abs();
        let far_axis_m = (sep_m / (2.0 * guard_divisor(str_far_rad.sin(), MIN_ABS_SIN))).abs();

        let left_radius_m = self.geom.left_wheel_radius_m;
        let right_radius_m = self.geom.right_wheel_radius_m;

        SideMagnitudes {
            str_near_rad,
            str_far_rad,
            drv_near_rads: (angular_rads * near_axis_m / left_radius_m).abs() * comp,
            drv_far_rads: (angular_rads * far_axis_m / right_radius_m).abs() * comp,
            drv_mid_near_rads: (angular_rads * (curv_radius_m - base_m) / left_radius_m).abs()
                * comp,
            drv_mid_far_rads: (angular_rads * (curv_radius_m + base_m) / right_radius_m).abs()
                * comp,
        }
    }

    /// Map the near/far magnitudes onto the physical axes with the quadrant's
    /// signs.
    fn apply_quadrant(&self, quadrant: Quadrant, mags: &SideMagnitudes) -> WheelActuatorSetpoint {
        let signs = quadrant.signs();
        let corr = self.geom.steering_angle_correction;

        let (str_left, str_right) =
            quadrant.near_far_to_left_right(mags.str_near_rad, mags.str_far_rad);
        let (drv_left, drv_right) =
            quadrant.near_far_to_left_right(mags.drv_near_rads, mags.drv_far_rads);
        let (drv_mid_left, drv_mid_right) =
            quadrant.near_far_to_left_right(mags.drv_mid_near_rads, mags.drv_mid_far_rads);

        let str_left = signs.str_left * str_left * corr;
        let str_right = signs.str_right * str_right * corr;
        let drv_left = signs.drv_left * drv_left;
        let drv_right = signs.drv_right * drv_right;

        let mut sp = WheelActuatorSetpoint::halt();

        sp.drv_rate_rads[DRV_LF] = drv_left;
        sp.drv_rate_rads[DRV_LR] = drv_left;
        sp.drv_rate_rads[DRV_LM] = signs.drv_left * drv_mid_left;
        sp.drv_rate_rads[DRV_RF] = drv_right;
        sp.drv_rate_rads[DRV_RR] = drv_right;
        sp.drv_rate_rads[DRV_RM] = signs.drv_right * drv_mid_right;

        // Rear axle mirrors the front
        sp.str_abs_pos_rad[STR_LF] = str_left;
        sp.str_abs_pos_rad[STR_RF] = -str_right;
        sp.str_abs_pos_rad[STR_LR] = -str_left;
        sp.str_abs_pos_rad[STR_RR] = str_right;

        sp
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const TOL: f64 = 1e-12;

    fn geom() -> VehicleGeometry {
        VehicleGeometry {
            wheel_base_m: 0.3,
            wheel_separation_m: 0.6,
            left_wheel_radius_m: 0.1,
            right_wheel_radius_m: 0.1,
            angular_velocity_compensation: 1.0,
            steering_angle_correction: 1.0,
            wheels_per_side: 2,
            min_curvature_m: 1e-6,
        }
    }

    fn calc(lc: &LocoCtrl, linear_ms: f64, angular_rads: f64) -> WheelActuatorSetpoint {
        lc.calc_ackerman(&TwistCommand::new(linear_ms, angular_rads, 0.0))
            .unwrap()
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < TOL, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_undefined_radius() {
        let lc = LocoCtrl::new(geom());
        assert_eq!(
            lc.calc_ackerman(&TwistCommand::new(0.0, 0.5, 0.0)),
            Err(LocoCtrlError::UndefinedTurningRadius { angular_rads: 0.5 })
        );
    }

    #[test]
    fn test_invalid_cmd() {
        let lc = LocoCtrl::new(geom());
        assert!(matches!(
            lc.calc_ackerman(&TwistCommand::new(f64::NAN, 0.0, 0.0)),
            Err(LocoCtrlError::InvalidCmd(_))
        ));
        assert!(matches!(
            lc.calc_ackerman(&TwistCommand::new(1.0, f64::INFINITY, 0.0)),
            Err(LocoCtrlError::InvalidCmd(_))
        ));
    }

    #[test]
    fn test_straight() {
        let mut g = geom();
        g.left_wheel_radius_m = 0.2;
        g.right_wheel_radius_m = 0.25;
        let lc = LocoCtrl::new(g);

        let sp = calc(&lc, 1.0, 0.0);
        assert_eq!(sp.str_abs_pos_rad, [0.0; NUM_STR_AXES]);
        assert_close(&sp.drv_rate_rads, &[5.0, 5.0, 5.0, 4.0, 4.0, 4.0]);

        // Reverse straight keeps left on left and negates every rate
        let sp = calc(&lc, -1.0, 0.0);
        assert_eq!(sp.str_abs_pos_rad, [0.0; NUM_STR_AXES]);
        assert_close(&sp.drv_rate_rads, &[-5.0, -5.0, -5.0, -4.0, -4.0, -4.0]);
    }

    #[test]
    fn test_all_zero_is_halt() {
        let lc = LocoCtrl::new(geom());
        assert!(calc(&lc, 0.0, 0.0).is_halt());
    }

    #[test]
    fn test_gentle_turn_is_straight() {
        let lc = LocoCtrl::new(geom());

        let sp = calc(&lc, 1.0, 1e-12);
        assert_eq!(sp.str_abs_pos_rad, [0.0; NUM_STR_AXES]);
        assert_close(&sp.drv_rate_rads, &[10.0; NUM_DRV_AXES]);
        assert!(sp.drv_rate_rads.iter().all(|r| r.is_finite()));
    }

    #[test]
    fn test_generic_turn() {
        let lc = LocoCtrl::new(geom());

        // R = 2 m
        let sp = calc(&lc, 1.0, 0.5);
        let near = FRAC_PI_2 - ((4.0 - 0.3) / 0.6f64).atan();
        let far = FRAC_PI_2 - ((4.0 + 0.3) / 0.6f64).atan();

        assert_close(&sp.str_abs_pos_rad, &[near, -far, -near, far]);

        // Inner (left) wheels turn slower than the outer ones
        assert!(sp.drv_rate_rads[DRV_LF] < sp.drv_rate_rads[DRV_RF]);
        assert!(sp.drv_rate_rads[DRV_LM] < sp.drv_rate_rads[DRV_RM]);
        assert!((sp.drv_rate_rads[DRV_LM] - 0.5 * 1.7 / 0.1).abs() < TOL);
        assert!((sp.drv_rate_rads[DRV_RM] - 0.5 * 2.3 / 0.1).abs() < TOL);
        assert_eq!(sp.drv_rate_rads[DRV_LF], sp.drv_rate_rads[DRV_LR]);
    }

    #[test]
    fn test_quadrant_symmetry_reverse() {
        let lc = LocoCtrl::new(geom());

        let fwd = calc(&lc, 1.0, 0.5);
        let rev = calc(&lc, -1.0, -0.5);

        // Identical steering, every rate negated
        assert_close(&fwd.str_abs_pos_rad, &rev.str_abs_pos_rad);
        for i in 0..NUM_DRV_AXES {
            assert!((fwd.drv_rate_rads[i] + rev.drv_rate_rads[i]).abs() < TOL);
        }
    }

    #[test]
    fn test_quadrant_symmetry_mirror() {
        let lc = LocoCtrl::new(geom());

        let ccw = calc(&lc, 1.0, 0.5);
        let cw = calc(&lc, 1.0, -0.5);

        // The near wheel swaps side, so each steering angle is the mirror of
        // the opposite side's
        assert!((cw.str_abs_pos_rad[STR_LF] - ccw.str_abs_pos_rad[STR_RF]).abs() < TOL);
        assert!((cw.str_abs_pos_rad[STR_RF] - ccw.str_abs_pos_rad[STR_LF]).abs() < TOL);
        assert!((cw.str_abs_pos_rad[STR_LR] - ccw.str_abs_pos_rad[STR_RR]).abs() < TOL);

        // And with equal radii the wheel rates swap sides
        assert!((cw.drv_rate_rads[DRV_LF] - ccw.drv_rate_rads[DRV_RF]).abs() < TOL);
        assert!((cw.drv_rate_rads[DRV_LM] - ccw.drv_rate_rads[DRV_RM]).abs() < TOL);
        assert!((cw.drv_rate_rads[DRV_RR] - ccw.drv_rate_rads[DRV_LR]).abs() < TOL);
    }

    #[test]
    fn test_quadrant_symmetry_reverse_ccw() {
        let lc = LocoCtrl::new(geom());

        let fwd_cw = calc(&lc, 1.0, -0.5);
        let rev_ccw = calc(&lc, -1.0, 0.5);

        assert_close(&fwd_cw.str_abs_pos_rad, &rev_ccw.str_abs_pos_rad);
        for i in 0..NUM_DRV_AXES {
            assert!((fwd_cw.drv_rate_rads[i] + rev_ccw.drv_rate_rads[i]).abs() < TOL);
        }
    }

    #[test]
    fn test_steering_correction() {
        let mut g = geom();
        g.steering_angle_correction = 2.0;
        let corrected = LocoCtrl::new(g);
        let nominal = LocoCtrl::new(geom());

        let a = calc(&corrected, 1.0, 0.5);
        let b = calc(&nominal, 1.0, 0.5);

        for i in 0..NUM_STR_AXES {
            assert!((a.str_abs_pos_rad[i] - 2.0 * b.str_abs_pos_rad[i]).abs() < TOL);
        }
        assert_close(&a.drv_rate_rads, &b.drv_rate_rads);
    }
}
