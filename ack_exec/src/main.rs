//! Main Ackermann controller executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise the command source, either a script or standard input
//!     - Main loop:
//!         - Command acquisition
//!         - Wheel feedback from the simulated mechanisms
//!         - AckCtrl processing
//!         - Simulated mechanisms update
//!     - Save the odometry trajectory to the session
//!
//! # Usage
//!
//! `ack_exec [SCRIPT]`. With a script path the commands are read from the
//! script, otherwise JSON commands are read from standard input, one per
//! line.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, trace, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use ack_lib::{
    ack_ctrl::{AckCtrl, InitData, InputData, Params},
    cmd_client::{CmdClient, CmdClientError},
    loco_ctrl::{TwistCommand, WheelActuatorSetpoint},
    odom::OdomReport,
    sim_mech::{SimMech, SimMechParams},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingCmds, ScriptInterpreter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("ack_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Six Wheel Ackermann Controller Executable\n");
    info!(
        "Software root: {:?}",
        host::get_sw_root().wrap_err("Failed to get the software root")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: Params =
        util::params::load("ack_ctrl.toml").wrap_err("Could not load AckCtrl params")?;
    let sim_params: SimMechParams =
        util::params::load("sim_mech.toml").wrap_err("Could not load SimMech params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE CMD SOURCE ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // If we have a single argument use it as the script path
    let mut cmd_source = if args.len() == 2 {
        info!("Loading script from \"{}\"", &args[1]);

        let si = ScriptInterpreter::<TwistCommand>::new(&args[1])
            .wrap_err("Failed to load script")?;

        info!(
            "Loaded script lasts {:.02} s and contains {} commands\n",
            si.get_duration(),
            si.get_num_cmds()
        );

        CmdSource::Script(si)
    }
    // If no arguments read commands from stdin
    else if args.len() == 1 {
        info!("No script provided, commands will be read from stdin\n");

        CmdSource::Remote(CmdClient::new())
    } else {
        return Err(eyre!(
            "Expected either zero or one argument, found {}",
            args.len() - 1
        ));
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ack_ctrl = AckCtrl::default();
    ack_ctrl
        .init(InitData {
            params: params.clone(),
            time_s: session::get_elapsed_seconds(),
        })
        .wrap_err("Failed to initialise AckCtrl")?;
    info!("AckCtrl init complete");

    let mut sim_mech = SimMech::new(sim_params, params.wheels_per_side());
    info!("SimMech init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    let mut latest_cmd: Option<TwistCommand> = None;
    let mut setpoint = WheelActuatorSetpoint::halt();
    let mut trajectory: Vec<OdomReport> = Vec::new();
    let mut prev_time_s = session::get_elapsed_seconds();

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();
        let time_s = session::get_elapsed_seconds();

        // ---- COMMAND ACQUISITION ----

        match cmd_source {
            CmdSource::Script(ref mut si) => match si.get_pending(time_s) {
                PendingCmds::None => (),
                PendingCmds::Some(cmds) => {
                    if let Some(mut cmd) = cmds.last().copied() {
                        if cmd.stamp_s == 0.0 {
                            cmd.stamp_s = time_s;
                        }
                        info!("New command: {:?}", cmd);
                        latest_cmd = Some(cmd);
                    }
                }
                // Exit if end of script reached
                PendingCmds::EndOfScript => {
                    info!("End of command script reached, stopping");
                    break;
                }
            },
            CmdSource::Remote(ref mut client) => match client.recieve_cmd(time_s) {
                Ok(cmd) => latest_cmd = cmd,
                Err(CmdClientError::Disconnected) => {
                    info!("Command input closed, stopping");
                    break;
                }
                Err(e) => warn!("Could not recieve command: {}", e),
            },
        }

        // ---- DATA INPUT ----

        sim_mech.step(&setpoint, time_s - prev_time_s);
        prev_time_s = time_s;

        let input = InputData {
            cmd: latest_cmd,
            feedback: Some(sim_mech.feedback()),
            time_s,
        };

        // ---- CONTROL ALGORITHM PROCESSING ----

        let (output, report) = ack_ctrl
            .proc(&input)
            .wrap_err("Error during AckCtrl processing")?;

        // Actuators keep their previous demands if no setpoint was produced
        if let Some(sp) = output.setpoint {
            setpoint = sp;
            trace!("Joint demands: {:?}", sp.to_joint_demands(&params.joints));
        }

        if let Some(cmd) = output.limited_cmd {
            if report.linear_scale != 1.0 || report.angular_scale != 1.0 {
                debug!(
                    "Command limited to {:.03} m/s, {:.03} rad/s",
                    cmd.linear_ms, cmd.angular_rads
                );
            }
        }

        if let Some(odom) = output.odom {
            trace!("Odometry: {:?}", odom);
            trajectory.push(odom);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            ),
        }
    }

    // ---- SHUTDOWN ----

    if let Some(odom) = ack_ctrl.odometry() {
        info!("Final pose: {:?}", odom.pose());
    }

    info!("Saving {} odometry reports", trajectory.len());
    session.save("odom_trajectory.json", trajectory);
    session.exit();

    info!("End of execution");

    Ok(())
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the commands incoming to the exec.
enum CmdSource {
    Remote(CmdClient),
    Script(ScriptInterpreter<TwistCommand>),
}
