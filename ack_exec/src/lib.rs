//! # Ackermann controller library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the controller crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Ackermann controller - the cyclic orchestrator of limiting, odometry and locomotion control
pub mod ack_ctrl;

/// Command client - recieves twist commands from a script or standard input
pub mod cmd_client;

/// Locomotion control module - converts twist commands into individual wheel commands
pub mod loco_ctrl;

/// Odometry - estimates the vehicle's pose from commands or wheel feedback
pub mod odom;

/// Simulated mechanisms - a simple actuator model which provides wheel feedback
pub mod sim_mech;

/// Speed limiter - bounds the velocity, acceleration and jerk of each command axis
pub mod speed_limiter;
