//! # Ackermann controller module
//!
//! The cyclic controller tying the speed limiters, odometry and locomotion
//! control together. Each cycle:
//!
//!  1. A halted controller outputs the halt setpoint and does nothing else.
//!  2. The latest command is taken, or a stop if there is none or it is
//!     older than the command timeout.
//!  3. A command with no defined turning radius is rejected before it can
//!     change any state.
//!  4. Both command axes are limited against the command history.
//!  5. Locomotion control converts the limited command into a setpoint. If
//!     the limited command has no defined turning radius the cycle is
//!     rejected and no state changes.
//!  6. Odometry is updated from the limited command (open loop) or the wheel
//!     feedback (closed loop). Bad feedback freezes the estimate and the
//!     halt setpoint is output.
//!  7. Odometry is published if the publish period has elapsed.
//!
//! Too many consecutive faulty cycles halt the controller until it is reset
//! or reconfigured.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, info, trace, warn};
use serde::Serialize;
use thiserror::Error;
use util::module::State;

// Internal
use crate::loco_ctrl::{LocoCtrl, LocoCtrlError, TwistCommand, WheelActuatorSetpoint};
use crate::odom::{
    FeedbackError, OdomError, OdomInput, OdomReport, OdomSource, OdometryEstimator, WheelFeedback,
};
use crate::speed_limiter::{CommandHistory, SpeedLimiter};
pub use params::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance on the publish period to absorb floating point error in
/// timestamps.
const PUBLISH_TOLERANCE_S: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Ackermann controller module state
#[derive(Debug, Default)]
pub struct AckCtrl {
    lifecycle: Lifecycle,

    /// Present once the controller has been configured.
    configured: Option<Configured>,
}

/// State of a configured controller.
#[derive(Debug)]
struct Configured {
    params: Params,

    loco_ctrl: LocoCtrl,
    linear_limiter: SpeedLimiter,
    angular_limiter: SpeedLimiter,
    odom: OdometryEstimator,

    history: CommandHistory,

    /// Time of the previous cycle.
    ///
    /// Units: seconds
    prev_update_s: f64,

    /// Time the odometry was last due for publication.
    ///
    /// Units: seconds
    prev_publish_s: f64,

    num_consec_faults: u32,
}

/// Initialisation data for the controller.
#[derive(Debug, Clone)]
pub struct InitData {
    pub params: Params,

    /// Units: seconds
    pub time_s: f64,
}

/// Input data to the controller.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// The latest command received, or `None` if no command has been received
    /// yet.
    pub cmd: Option<TwistCommand>,

    /// Latest wheel feedback, required for closed loop odometry.
    pub feedback: Option<WheelFeedback>,

    /// Time of this cycle.
    ///
    /// Units: seconds
    pub time_s: f64,
}

/// Output data from the controller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputData {
    /// Setpoint to send to the actuators, or `None` if the actuators should
    /// keep their previous demands.
    pub setpoint: Option<WheelActuatorSetpoint>,

    /// Odometry, if due for publication on this cycle.
    pub odom: Option<OdomReport>,

    /// The command after limiting, if enabled.
    pub limited_cmd: Option<TwistCommand>,
}

/// Status report for the controller.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub lifecycle: Lifecycle,

    /// The command was missing or too old and a stop was used instead.
    pub cmd_stale: bool,

    /// Scale applied to each command axis by the limiters.
    pub linear_scale: f64,
    pub angular_scale: f64,

    pub odom_published: bool,

    /// The fault raised on this cycle, if any.
    #[serde(serialize_with = "serialize_fault")]
    pub fault: Option<TickFault>,

    pub num_consec_faults: u32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Lifecycle {
    Unconfigured,
    Active,
    Halted,
}

/// Faults which affect a single cycle.
#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum TickFault {
    #[error("Kinematics error: {0}")]
    Kinematics(LocoCtrlError),

    #[error("Invalid wheel feedback: {0}")]
    Feedback(FeedbackError),

    #[error("No wheel feedback available for closed loop odometry")]
    NoFeedback,

    #[error("Odometry error: {0}")]
    Odom(OdomError),
}

/// Errors which prevent the controller from processing.
#[derive(Debug, Error)]
pub enum AckCtrlError {
    #[error("The controller must be initialised before it can be processed")]
    NotConfigured,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle::Unconfigured
    }
}

impl StatusReport {
    fn new(lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle,
            cmd_stale: false,
            linear_scale: 1.0,
            angular_scale: 1.0,
            odom_published: false,
            fault: None,
            num_consec_faults: 0,
        }
    }
}

impl Configured {
    fn new(params: Params, time_s: f64) -> Result<Self, ParamsError> {
        let c = params.build()?;

        let mut configured = Self {
            params,
            loco_ctrl: c.loco_ctrl,
            linear_limiter: c.linear_limiter,
            angular_limiter: c.angular_limiter,
            odom: c.odom,
            history: CommandHistory::new(),
            prev_update_s: time_s,
            prev_publish_s: time_s,
            num_consec_faults: 0,
        };
        configured.reset(time_s);

        Ok(configured)
    }

    fn reset(&mut self, time_s: f64) {
        self.odom.reset_odometry();
        self.odom.init(time_s);
        self.history.reset();
        self.prev_update_s = time_s;
        self.prev_publish_s = time_s;
        self.num_consec_faults = 0;
    }

    /// Run one active cycle, returning the setpoint and limited command.
    ///
    /// A fault is recorded in the report.
    fn tick(
        &mut self,
        input: &InputData,
        report: &mut StatusReport,
    ) -> (Option<WheelActuatorSetpoint>, Option<TwistCommand>) {
        let now_s = input.time_s;

        // ---- COMMAND ----

        let cmd = match input.cmd {
            Some(c) if c.age_s(now_s) <= self.params.cmd_timeout_s => c,
            _ => {
                report.cmd_stale = true;
                TwistCommand::zero(now_s)
            }
        };

        if !cmd.is_finite() {
            report.fault = Some(TickFault::Kinematics(LocoCtrlError::InvalidCmd(cmd)));
            return (None, None);
        }
        if cmd.has_undefined_turn() {
            report.fault = Some(TickFault::Kinematics(
                LocoCtrlError::UndefinedTurningRadius {
                    angular_rads: cmd.angular_rads,
                },
            ));
            return (None, None);
        }

        // ---- LIMITING ----

        let dt_s = now_s - self.prev_update_s;

        let mut limited = TwistCommand { stamp_s: now_s, ..cmd };
        let prev = *self.history.previous();
        let second_prev = *self.history.second_previous();

        report.linear_scale = self.linear_limiter.limit(
            &mut limited.linear_ms,
            prev.linear_ms,
            second_prev.linear_ms,
            dt_s,
        );
        report.angular_scale = self.angular_limiter.limit(
            &mut limited.angular_rads,
            prev.angular_rads,
            second_prev.angular_rads,
            dt_s,
        );

        let limited_out = if self.params.publish_limited_velocity {
            Some(limited)
        } else {
            None
        };

        // ---- KINEMATICS ----

        // Solved before any state is committed, limiting can still produce a
        // command with no turning radius.
        let setpoint = match self.loco_ctrl.calc_ackerman(&limited) {
            Ok(sp) => sp,
            Err(e) => {
                report.fault = Some(TickFault::Kinematics(e));
                return (None, limited_out);
            }
        };

        self.prev_update_s = now_s;
        self.history.push(limited);

        // ---- ODOMETRY ----

        if let Err(fault) = self.update_odom(&limited, input) {
            report.fault = Some(fault);
            return (Some(WheelActuatorSetpoint::halt()), limited_out);
        }

        (Some(setpoint), limited_out)
    }

    fn update_odom(&mut self, limited: &TwistCommand, input: &InputData) -> Result<(), TickFault> {
        let odom_input = match self.odom.source() {
            OdomSource::OpenLoop => OdomInput::Cmd {
                linear_ms: limited.linear_ms,
                angular_rads: limited.angular_rads,
            },
            OdomSource::ClosedLoop => {
                let fb = input.feedback.as_ref().ok_or(TickFault::NoFeedback)?;
                OdomInput::Feedback(
                    fb.reduce(self.params.wheels_per_side())
                        .map_err(TickFault::Feedback)?,
                )
            }
        };

        self.odom
            .update(&odom_input, input.time_s)
            .map_err(TickFault::Odom)
    }

    /// Returns the odometry report if it is due at `now_s`.
    fn publish(&mut self, now_s: f64) -> Option<OdomReport> {
        let period_s = self.params.publish_period_s();

        if now_s - self.prev_publish_s + PUBLISH_TOLERANCE_S < period_s {
            return None;
        }

        // Keep to the publish schedule unless more than a whole period has
        // been missed.
        self.prev_publish_s += period_s;
        if now_s - self.prev_publish_s > period_s {
            self.prev_publish_s = now_s;
        }

        Some(OdomReport::new(
            now_s,
            self.odom.pose(),
            self.odom.velocity(),
            &self.params.odom.frames,
        ))
    }
}

impl State for AckCtrl {
    type InitData = InitData;
    type InitError = ParamsError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = AckCtrlError;

    /// Initialise the controller, validating the parameters.
    ///
    /// On success the controller is active. On error it remains unconfigured.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        self.configured = Some(Configured::new(init_data.params, init_data.time_s)?);
        self.lifecycle = Lifecycle::Active;

        info!("AckCtrl configured and active");

        Ok(())
    }

    /// Perform cyclic processing of the controller.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let cfg = self
            .configured
            .as_mut()
            .ok_or(AckCtrlError::NotConfigured)?;

        let mut report = StatusReport::new(self.lifecycle);

        if self.lifecycle == Lifecycle::Halted {
            cfg.prev_update_s = input_data.time_s;

            return Ok((
                OutputData {
                    setpoint: Some(WheelActuatorSetpoint::halt()),
                    ..Default::default()
                },
                report,
            ));
        }

        let (setpoint, limited_cmd) = cfg.tick(input_data, &mut report);

        let odom = cfg.publish(input_data.time_s);
        report.odom_published = odom.is_some();

        match report.fault {
            Some(ref fault) => {
                cfg.num_consec_faults += 1;
                warn!(
                    "AckCtrl fault ({} consecutive): {}",
                    cfg.num_consec_faults, fault
                );
            }
            None => cfg.num_consec_faults = 0,
        }
        report.num_consec_faults = cfg.num_consec_faults;

        let mut output = OutputData {
            setpoint,
            odom,
            limited_cmd,
        };

        if cfg.num_consec_faults > cfg.params.max_consec_faults {
            error!(
                "More than {} consecutive faults, halting AckCtrl",
                cfg.params.max_consec_faults
            );
            self.lifecycle = Lifecycle::Halted;
            report.lifecycle = Lifecycle::Halted;
            output.setpoint = Some(WheelActuatorSetpoint::halt());
        }

        trace!("AckCtrl output: {:?}", output.setpoint);

        Ok((output, report))
    }
}

impl AckCtrl {
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// The parameters in use, if configured.
    pub fn params(&self) -> Option<&Params> {
        self.configured.as_ref().map(|c| &c.params)
    }

    /// The odometry estimator, if configured.
    pub fn odometry(&self) -> Option<&OdometryEstimator> {
        self.configured.as_ref().map(|c| &c.odom)
    }

    /// Halt the controller. Every following cycle outputs the halt setpoint
    /// until the controller is reset or reconfigured.
    pub fn deactivate(&mut self) {
        if self.lifecycle == Lifecycle::Active {
            info!("AckCtrl deactivated");
            self.lifecycle = Lifecycle::Halted;
        }
    }

    /// Clear the odometry and command history and resume processing.
    pub fn reset(&mut self, time_s: f64) -> Result<(), AckCtrlError> {
        let cfg = self
            .configured
            .as_mut()
            .ok_or(AckCtrlError::NotConfigured)?;

        cfg.reset(time_s);
        self.lifecycle = Lifecycle::Active;

        info!("AckCtrl reset");

        Ok(())
    }

    /// Validate and apply new parameters, then reset.
    ///
    /// If the parameters are invalid the current configuration and lifecycle
    /// are kept.
    pub fn reconfigure(&mut self, params: Params, time_s: f64) -> Result<(), ParamsError> {
        let configured = Configured::new(params, time_s)?;

        self.configured = Some(configured);
        self.lifecycle = Lifecycle::Active;

        info!("AckCtrl reconfigured");

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Faults are saved as their description.
fn serialize_fault<S>(fault: &Option<TickFault>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(&match fault {
        Some(f) => f.to_string(),
        None => String::new(),
    })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::params::test::params;
    use super::*;
    use crate::loco_ctrl::{DRV_LF, NUM_DRV_AXES};
    use crate::odom::{Pose, WheelFeedback};

    const CYCLE_S: f64 = 0.02;

    fn ack_ctrl(params: Params) -> AckCtrl {
        let mut ac = AckCtrl::default();
        ac.init(InitData {
            params,
            time_s: 0.0,
        })
        .unwrap();
        ac
    }

    fn input(cmd: Option<TwistCommand>, time_s: f64) -> InputData {
        InputData {
            cmd,
            feedback: None,
            time_s,
        }
    }

    #[test]
    fn test_not_configured() {
        let mut ac = AckCtrl::default();
        assert_eq!(ac.lifecycle(), Lifecycle::Unconfigured);
        assert!(matches!(
            ac.proc(&input(None, 0.0)),
            Err(AckCtrlError::NotConfigured)
        ));
        assert!(ac.reset(0.0).is_err());
    }

    #[test]
    fn test_invalid_params_stay_unconfigured() {
        let mut p = params();
        p.cmd_timeout_s = -1.0;

        let mut ac = AckCtrl::default();
        assert!(ac.init(InitData { params: p, time_s: 0.0 }).is_err());
        assert_eq!(ac.lifecycle(), Lifecycle::Unconfigured);
    }

    #[test]
    fn test_drive_straight() {
        let mut ac = ack_ctrl(params());

        let cmd = TwistCommand::new(0.5, 0.0, 0.0);
        let (out, report) = ac.proc(&input(Some(cmd), CYCLE_S)).unwrap();

        assert!(report.fault.is_none());
        assert!(!report.cmd_stale);

        let sp = out.setpoint.unwrap();
        assert!(sp.drv_rate_rads.iter().all(|r| (r - 5.0).abs() < 1e-9));
        assert_eq!(out.limited_cmd.unwrap().linear_ms, 0.5);

        let odom = ac.odometry().unwrap();
        assert!((odom.pose().x_m - 0.5 * CYCLE_S).abs() < 1e-12);
    }

    #[test]
    fn test_velocity_limited() {
        let mut ac = ack_ctrl(params());

        // Linear velocity is limited to 1 m/s
        let cmd = TwistCommand::new(2.0, 0.0, 0.0);
        let (out, report) = ac.proc(&input(Some(cmd), CYCLE_S)).unwrap();

        assert!((report.linear_scale - 0.5).abs() < 1e-12);
        assert_eq!(out.limited_cmd.unwrap().linear_ms, 1.0);
        assert!((out.setpoint.unwrap().drv_rate_rads[DRV_LF] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_stale_cmd() {
        let mut ac = ack_ctrl(params());

        // Issued at 0 s, processed at 1 s with a 0.5 s timeout
        let cmd = TwistCommand::new(1.0, 0.5, 0.0);
        let (out, report) = ac.proc(&input(Some(cmd), 1.0)).unwrap();

        assert!(report.cmd_stale);
        assert!(report.fault.is_none());
        assert!(out.setpoint.unwrap().drv_rate_rads.iter().all(|r| *r == 0.0));
        assert_eq!(*ac.odometry().unwrap().pose(), Pose::default());

        // No command at all behaves the same
        let (out, report) = ac.proc(&input(None, 1.02)).unwrap();
        assert!(report.cmd_stale);
        assert!(out.setpoint.unwrap().is_halt());
    }

    #[test]
    fn test_undefined_turn_changes_nothing() {
        let mut ac = ack_ctrl(params());

        ac.proc(&input(Some(TwistCommand::new(0.5, 0.0, 0.0)), CYCLE_S))
            .unwrap();
        let pose = *ac.odometry().unwrap().pose();

        let (out, report) = ac
            .proc(&input(Some(TwistCommand::new(0.0, 0.5, 0.04)), 0.04))
            .unwrap();

        assert!(out.setpoint.is_none());
        assert!(matches!(
            report.fault,
            Some(TickFault::Kinematics(
                LocoCtrlError::UndefinedTurningRadius { .. }
            ))
        ));
        assert_eq!(report.num_consec_faults, 1);
        assert_eq!(*ac.odometry().unwrap().pose(), pose);
    }

    #[test]
    fn test_limited_undefined_turn_changes_nothing() {
        let mut p = params();
        p.linear = util::params::parse(
            r#"
                has_acceleration_limits = true
                max_acceleration = 1.0
            "#,
        )
        .unwrap();
        let mut ac = ack_ctrl(p);

        ac.proc(&input(Some(TwistCommand::new(0.5, 0.0, 0.5)), 0.5))
            .unwrap();
        let pose = *ac.odometry().unwrap().pose();

        // Decelerating at 1 m/s^2 over 0.5 s brings the linear speed to
        // exactly zero while the yaw rate is untouched
        let (out, report) = ac
            .proc(&input(Some(TwistCommand::new(-1.0, 0.5, 1.0)), 1.0))
            .unwrap();

        let limited = out.limited_cmd.unwrap();
        assert_eq!(limited.linear_ms, 0.0);
        assert_eq!(limited.angular_rads, 0.5);
        assert!(out.setpoint.is_none());
        assert!(matches!(
            report.fault,
            Some(TickFault::Kinematics(
                LocoCtrlError::UndefinedTurningRadius { .. }
            ))
        ));
        assert_eq!(*ac.odometry().unwrap().pose(), pose);

        // The rejected command did not enter the history, so the next cycle
        // still limits from 0.5 m/s
        let (out, report) = ac
            .proc(&input(Some(TwistCommand::new(0.5, 0.0, 1.02)), 1.02))
            .unwrap();
        assert!(report.fault.is_none());
        assert_eq!(out.limited_cmd.unwrap().linear_ms, 0.5);
        assert!(ac.odometry().unwrap().pose().x_m > pose.x_m);
    }

    #[test]
    fn test_closed_loop_bad_feedback_halts_tick() {
        let mut p = params();
        p.odom.source = OdomSource::ClosedLoop;
        let mut ac = ack_ctrl(p);

        let cmd = Some(TwistCommand::new(0.5, 0.0, 0.0));

        // Missing feedback
        let (out, report) = ac.proc(&input(cmd, CYCLE_S)).unwrap();
        assert_eq!(report.fault, Some(TickFault::NoFeedback));
        assert!(out.setpoint.unwrap().is_halt());

        // NaN feedback
        let mut fb = WheelFeedback::from_axes(&[10.0; NUM_DRV_AXES], &[0.0; 4], 2);
        fb.left_drv_rate_rpm[0] = f64::NAN;
        let (out, report) = ac
            .proc(&InputData {
                cmd,
                feedback: Some(fb),
                time_s: 2.0 * CYCLE_S,
            })
            .unwrap();
        assert!(matches!(report.fault, Some(TickFault::Feedback(_))));
        assert!(out.setpoint.unwrap().is_halt());
        assert_eq!(*ac.odometry().unwrap().pose(), Pose::default());

        // Good feedback drives normally
        let fb = WheelFeedback::from_axes(&[10.0; NUM_DRV_AXES], &[0.0; 4], 2);
        let (out, report) = ac
            .proc(&InputData {
                cmd,
                feedback: Some(fb),
                time_s: 3.0 * CYCLE_S,
            })
            .unwrap();
        assert!(report.fault.is_none());
        assert!(!out.setpoint.unwrap().is_halt());
        assert!(ac.odometry().unwrap().pose().x_m > 0.0);
    }

    #[test]
    fn test_publish_rate() {
        let mut p = params();
        p.publish_rate_hz = 25.0;
        let mut ac = ack_ctrl(p);

        let published: Vec<bool> = (1..=6)
            .map(|i| {
                let t = i as f64 * CYCLE_S;
                let (out, report) = ac.proc(&input(None, t)).unwrap();
                assert_eq!(out.odom.is_some(), report.odom_published);
                report.odom_published
            })
            .collect();

        assert_eq!(published, vec![false, true, false, true, false, true]);
    }

    #[test]
    fn test_consecutive_faults_halt() {
        let mut p = params();
        p.max_consec_faults = 2;
        let mut ac = ack_ctrl(p);

        let bad = Some(TwistCommand::new(0.0, 1.0, 0.0));
        for i in 1..=3 {
            let t = i as f64 * CYCLE_S;
            let mut cmd = bad;
            if let Some(c) = cmd.as_mut() {
                c.stamp_s = t;
            }
            ac.proc(&input(cmd, t)).unwrap();
        }

        assert_eq!(ac.lifecycle(), Lifecycle::Halted);

        // Halted ignores commands
        let good = Some(TwistCommand::new(0.5, 0.0, 0.1));
        let (out, report) = ac.proc(&input(good, 0.1)).unwrap();
        assert_eq!(report.lifecycle, Lifecycle::Halted);
        assert!(out.setpoint.unwrap().is_halt());

        // Until reset
        ac.reset(0.1).unwrap();
        let good = Some(TwistCommand::new(0.5, 0.0, 0.12));
        let (out, _) = ac.proc(&input(good, 0.12)).unwrap();
        assert!(!out.setpoint.unwrap().is_halt());
    }

    #[test]
    fn test_deactivate_and_reconfigure() {
        let mut ac = ack_ctrl(params());

        ac.deactivate();
        assert_eq!(ac.lifecycle(), Lifecycle::Halted);

        let cmd = Some(TwistCommand::new(0.5, 0.0, 0.02));
        let (out, _) = ac.proc(&input(cmd, CYCLE_S)).unwrap();
        assert!(out.setpoint.unwrap().is_halt());

        // Invalid parameters are rejected and the controller stays halted
        let mut bad = params();
        bad.publish_rate_hz = 0.0;
        assert!(ac.reconfigure(bad, CYCLE_S).is_err());
        assert_eq!(ac.lifecycle(), Lifecycle::Halted);

        let mut p = params();
        p.publish_limited_velocity = false;
        ac.reconfigure(p, CYCLE_S).unwrap();
        assert_eq!(ac.lifecycle(), Lifecycle::Active);

        let cmd = Some(TwistCommand::new(0.5, 0.0, 0.04));
        let (out, _) = ac.proc(&input(cmd, 0.04)).unwrap();
        assert!(out.limited_cmd.is_none());
        assert!(!out.setpoint.unwrap().is_halt());
    }
}
