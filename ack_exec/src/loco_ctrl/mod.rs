//! Locomotion control module
//!
//! Converts a body frame twist command into individual wheel rates and
//! steering angles for the six wheeled, four steered Ackermann vehicle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_ackerman;
mod cmd;
mod params;
mod quadrant;
mod setpoint;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use calc_ackerman::*;
pub use cmd::*;
pub use params::*;
pub use quadrant::*;
pub use setpoint::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of drive axes on the vehicle.
pub const NUM_DRV_AXES: usize = 6;

/// The number of steer axes on the vehicle.
pub const NUM_STR_AXES: usize = 4;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LocoCtrl operation.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum LocoCtrlError {
    #[error(
        "Turning radius is undefined: angular rate {angular_rads} rad/s demanded \
         with zero linear speed"
    )]
    UndefinedTurningRadius { angular_rads: f64 },

    #[error("Recieved an invalid twist command: {0:?}")]
    InvalidCmd(TwistCommand),
}
