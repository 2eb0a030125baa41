//! # Command Client
//!
//! Recieves twist commands as JSON lines, for example
//! `{"linear_ms": 0.5, "angular_rads": 0.1}`, from standard input or any other
//! reader. Lines are read on a background thread so the control loop never
//! blocks waiting for a command.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use log::{debug, warn};

use crate::loco_ctrl::TwistCommand;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command client
pub struct CmdClient {
    rx: Receiver<String>,

    /// The newest command recieved so far.
    latest: Option<TwistCommand>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CmdClientError {
    #[error("The command source has closed")]
    Disconnected,

    #[error("Could not parse the recieved command: {0}")]
    CmdParseError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CmdClient {
    /// Create a client reading commands from standard input.
    pub fn new() -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    /// Create a client reading commands from the given reader.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for line in reader.lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        warn!("Could not read from the command source: {}", e);
                        break;
                    }
                };

                if line.trim().is_empty() {
                    continue;
                }

                if tx.send(line).is_err() {
                    break;
                }
            }

            debug!("Command source closed");
        });

        Self { rx, latest: None }
    }

    /// Recieve all pending commands, keeping only the newest.
    ///
    /// Commands are stamped with `now_s` when they don't carry a stamp.
    /// Returns the newest command recieved so far, which may be one from a
    /// previous call. Unparsable lines are logged and skipped. Once the source
    /// has closed and every pending line is handled `Disconnected` is returned.
    pub fn recieve_cmd(&mut self, now_s: f64) -> Result<Option<TwistCommand>, CmdClientError> {
        loop {
            match self.rx.try_recv() {
                Ok(line) => match parse_cmd(&line, now_s) {
                    Ok(cmd) => self.latest = Some(cmd),
                    Err(e) => warn!("Skipping command line {:?}: {}", line, e),
                },
                Err(TryRecvError::Empty) => return Ok(self.latest),
                Err(TryRecvError::Disconnected) => return Err(CmdClientError::Disconnected),
            }
        }
    }

    /// The newest command recieved so far.
    pub fn latest(&self) -> Option<TwistCommand> {
        self.latest
    }
}

impl Default for CmdClient {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse a single JSON command, stamping it with `now_s` if it has no stamp.
pub fn parse_cmd(line: &str, now_s: f64) -> Result<TwistCommand, CmdClientError> {
    let mut cmd: TwistCommand =
        serde_json::from_str(line).map_err(CmdClientError::CmdParseError)?;

    if cmd.stamp_s == 0.0 {
        cmd.stamp_s = now_s;
    }

    Ok(cmd)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
