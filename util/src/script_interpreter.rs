//! # Timed command script interpreter
//!
//! Scripts are plain text files made of timed entries of the form
//!
//! ```text
//! 1.5: {"linear_ms": 0.3, "angular_rads": 0.0};
//! ```
//!
//! where the number is the session-relative time in seconds at which the
//! entry becomes due and the payload is JSON deserialised into the
//! interpreter's command type.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Matches `<time>: <payload>;`, capturing the time in group 1 and the
/// payload in group 3.
const ENTRY_PATTERN: &str = r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
struct ScriptedCmd<T> {
    exec_time_s: f64,
    cmd: T,
}

/// A script interpreter.
///
/// After loading a script use `.get_pending` to acquire the commands which
/// have become due.
pub struct ScriptInterpreter<T> {
    cmds: VecDeque<ScriptedCmd<T>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script contains an invalid command at {0} s: {1}")]
    InvalidCmd(f64, serde_json::Error),
}

/// Commands pending execution.
pub enum PendingCmds<T> {
    None,
    Some(Vec<T>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> ScriptInterpreter<T>
where
    T: DeserializeOwned,
{
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = script_path.as_ref();

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(
                path.to_string_lossy().into_owned(),
            ));
        }

        let script = fs::read_to_string(path).map_err(ScriptError::ScriptLoadError)?;

        Self::from_script(&script)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_script(script: &str) -> Result<Self, ScriptError> {
        // The pattern is a constant so building it cannot fail in practice,
        // an error here is reported as an unreadable script.
        let re = RegexBuilder::new(ENTRY_PATTERN)
            .multi_line(true)
            .build()
            .map_err(|_| ScriptError::ScriptEmpty)?;

        let mut cmds = VecDeque::new();

        for cap in re.captures_iter(script) {
            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            let payload = cap.get(3).map(|m| m.as_str()).unwrap_or("");
            let cmd = serde_json::from_str(payload)
                .map_err(|e| ScriptError::InvalidCmd(exec_time_s, e))?;

            cmds.push_back(ScriptedCmd { exec_time_s, cmd });
        }

        if cmds.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(ScriptInterpreter { cmds })
    }

    /// Return the commands which are due at `current_time_s`.
    pub fn get_pending(&mut self, current_time_s: f64) -> PendingCmds<T> {
        if self.cmds.is_empty() {
            return PendingCmds::EndOfScript;
        }

        let mut due = vec![];

        while self
            .cmds
            .front()
            .map(|c| c.exec_time_s <= current_time_s)
            .unwrap_or(false)
        {
            if let Some(c) = self.cmds.pop_front() {
                due.push(c.cmd);
            }
        }

        if due.is_empty() {
            PendingCmds::None
        } else {
            PendingCmds::Some(due)
        }
    }

    /// Get the number of commands remaining in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Cmd {
        v: f64,
    }

    const SCRIPT: &str = "\
        # drive then stop\n\
        0.0: {\"v\": 1.0};\n\
        0.5: {\"v\": 2.0};\n\
        2: {\"v\": 0.0};\n";

    #[test]
    fn test_parse_and_pending() {
        let mut si = ScriptInterpreter::<Cmd>::from_script(SCRIPT).unwrap();
        assert_eq!(si.get_num_cmds(), 3);
        assert_eq!(si.get_duration(), 2.0);

        match si.get_pending(0.6) {
            PendingCmds::Some(v) => assert_eq!(v, vec![Cmd { v: 1.0 }, Cmd { v: 2.0 }]),
            _ => panic!("expected two pending commands"),
        }

        assert!(matches!(si.get_pending(1.0), PendingCmds::None));

        match si.get_pending(2.0) {
            PendingCmds::Some(v) => assert_eq!(v, vec![Cmd { v: 0.0 }]),
            _ => panic!("expected the final command"),
        }

        assert!(matches!(si.get_pending(3.0), PendingCmds::EndOfScript));
    }

    #[test]
    fn test_empty_script() {
        assert!(matches!(
            ScriptInterpreter::<Cmd>::from_script("nothing here"),
            Err(ScriptError::ScriptEmpty)
        ));
    }

    #[test]
    fn test_invalid_payload() {
        assert!(matches!(
            ScriptInterpreter::<Cmd>::from_script("1.0: {\"w\": 1};"),
            Err(ScriptError::InvalidCmd(t, _)) if t == 1.0
        ));
    }
}
