//! Parameters structure for LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Raw wheel parameters as configured.
///
/// The multipliers allow calibration of the nominal geometry without editing
/// the nominal values themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WheelParams {
    // ---- GEOMETRY ----

    /// Lateral separation term of the steering law.
    ///
    /// Units: meters
    pub wheel_separation_m: f64,

    /// Base term of the steering law.
    ///
    /// Units: meters
    pub wheel_base_m: f64,

    /// Nominal radius of the wheels.
    ///
    /// Units: meters
    pub wheel_radius_m: f64,

    // ---- CALIBRATION ----
    #[serde(default = "unity")]
    pub wheel_separation_multiplier: f64,

    #[serde(default = "unity")]
    pub wheel_base_multiplier: f64,

    #[serde(default = "unity")]
    pub left_wheel_radius_multiplier: f64,

    #[serde(default = "unity")]
    pub right_wheel_radius_multiplier: f64,

    /// Gain applied to the wheel rates of curved manouvres.
    #[serde(default = "unity")]
    pub angular_velocity_compensation: f64,

    /// Gain applied to all demanded steering angles, and removed from
    /// measured ones.
    #[serde(default = "unity")]
    pub steering_angle_correction: f64,

    /// Curvature below which a command is driven as a straight line.
    ///
    /// Units: 1/meters
    #[serde(default = "default_min_curvature_m")]
    pub min_curvature_m: f64,
}

/// Effective vehicle geometry, fixed for one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleGeometry {
    pub wheel_base_m: f64,
    pub wheel_separation_m: f64,
    pub left_wheel_radius_m: f64,
    pub right_wheel_radius_m: f64,
    pub angular_velocity_compensation: f64,
    pub steering_angle_correction: f64,
    pub wheels_per_side: usize,
    pub min_curvature_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("{0} must be finite and greater than zero, found {1}")]
    NotPositive(&'static str, f64),

    #[error("The steering angle correction must be finite and non-zero, found {0}")]
    InvalidSteeringCorrection(f64),

    #[error("The minimum curvature must be finite and not negative, found {0}")]
    InvalidMinCurvature(f64),

    #[error("There must be at least one wheel per side")]
    NoWheels,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleGeometry {
    /// Apply the calibration multipliers to the nominal wheel parameters and
    /// validate the result.
    pub fn from_params(params: &WheelParams, wheels_per_side: usize) -> Result<Self, GeometryError> {
        let geom = Self {
            wheel_base_m: params.wheel_base_m * params.wheel_base_multiplier,
            wheel_separation_m: params.wheel_separation_m * params.wheel_separation_multiplier,
            left_wheel_radius_m: params.wheel_radius_m * params.left_wheel_radius_multiplier,
            right_wheel_radius_m: params.wheel_radius_m * params.right_wheel_radius_multiplier,
            angular_velocity_compensation: params.angular_velocity_compensation,
            steering_angle_correction: params.steering_angle_correction,
            wheels_per_side,
            min_curvature_m: params.min_curvature_m,
        };

        geom.validate()?;

        Ok(geom)
    }

    /// Check the geometry invariants.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let positive = [
            ("wheel_base_m", self.wheel_base_m),
            ("wheel_separation_m", self.wheel_separation_m),
            ("left_wheel_radius_m", self.left_wheel_radius_m),
            ("right_wheel_radius_m", self.right_wheel_radius_m),
            (
                "angular_velocity_compensation",
                self.angular_velocity_compensation,
            ),
        ];

        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(GeometryError::NotPositive(name, *value));
            }
        }

        if !self.steering_angle_correction.is_finite() || self.steering_angle_correction == 0.0 {
            return Err(GeometryError::InvalidSteeringCorrection(
                self.steering_angle_correction,
            ));
        }

        if !self.min_curvature_m.is_finite() || self.min_curvature_m < 0.0 {
            return Err(GeometryError::InvalidMinCurvature(self.min_curvature_m));
        }

        if self.wheels_per_side == 0 {
            return Err(GeometryError::NoWheels);
        }

        Ok(())
    }

    /// Mean of the left and right wheel radii.
    ///
    /// Units: meters
    pub fn mean_wheel_radius_m(&self) -> f64 {
        0.5 * (self.left_wheel_radius_m + self.right_wheel_radius_m)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn unity() -> f64 {
    1.0
}

fn default_min_curvature_m() -> f64 {
    1e-6
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn wheel_params() -> WheelParams {
        util::params::parse(
            "wheel_separation_m = 0.5\n\
             wheel_base_m = 0.4\n\
             wheel_radius_m = 0.1\n\
             left_wheel_radius_multiplier = 1.1\n",
        )
        .unwrap()
    }

    #[test]
    fn test_multipliers_applied() {
        let geom = VehicleGeometry::from_params(&wheel_params(), 2).unwrap();

        assert_eq!(geom.wheel_base_m, 0.4);
        assert_eq!(geom.wheel_separation_m, 0.5);
        assert!((geom.left_wheel_radius_m - 0.11).abs() < 1e-12);
        assert_eq!(geom.right_wheel_radius_m, 0.1);
        assert_eq!(geom.angular_velocity_compensation, 1.0);
        assert_eq!(geom.min_curvature_m, 1e-6);
        assert!((geom.mean_wheel_radius_m() - 0.105).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_geometry() {
        let mut p = wheel_params();
        p.wheel_radius_m = 0.0;
        assert!(matches!(
            VehicleGeometry::from_params(&p, 2),
            Err(GeometryError::NotPositive("left_wheel_radius_m", _))
        ));

        let mut p = wheel_params();
        p.steering_angle_correction = 0.0;
        assert_eq!(
            VehicleGeometry::from_params(&p, 2),
            Err(GeometryError::InvalidSteeringCorrection(0.0))
        );

        assert_eq!(
            VehicleGeometry::from_params(&wheel_params(), 0),
            Err(GeometryError::NoWheels)
        );
    }
}
