//! Utility library for the six-wheel Ackermann drive software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod rolling_mean;
pub mod session;
pub mod script_interpreter;
pub mod time;
