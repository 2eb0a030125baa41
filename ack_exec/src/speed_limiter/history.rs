//! History of the commands applied after limiting

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::loco_ctrl::TwistCommand;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The two most recently applied commands.
///
/// Pushing a command evicts the oldest one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CommandHistory {
    second_previous: TwistCommand,
    previous: TwistCommand,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CommandHistory {
    /// A history holding two stop commands.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: TwistCommand) {
        self.second_previous = self.previous;
        self.previous = cmd;
    }

    /// The most recently applied command.
    pub fn previous(&self) -> &TwistCommand {
        &self.previous
    }

    /// The command applied before `previous`.
    pub fn second_previous(&self) -> &TwistCommand {
        &self.second_previous
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fifo() {
        let mut h = CommandHistory::new();
        assert_eq!(*h.previous(), TwistCommand::zero(0.0));
        assert_eq!(*h.second_previous(), TwistCommand::zero(0.0));

        h.push(TwistCommand::new(1.0, 0.0, 0.1));
        h.push(TwistCommand::new(2.0, 0.0, 0.2));
        h.push(TwistCommand::new(3.0, 0.0, 0.3));

        assert_eq!(h.previous().linear_ms, 3.0);
        assert_eq!(h.second_previous().linear_ms, 2.0);

        h.reset();
        assert_eq!(h, CommandHistory::new());
    }
}
