//! Quadrant classification of a motion demand
//!
//! The Ackermann calculation works with unsigned magnitudes for a near (inner)
//! and far (outer) side of the turn. The quadrant of the demand decides which
//! physical side is near and which signs are applied to the steering angles
//! and wheel rates.
//!
//! ```text
//!              angular > 0
//!                   |
//!        RevCcw (2) | FwdCcw (0)
//!   linear <= 0 ----+---- linear > 0
//!         RevCw (3) | FwdCw (1)
//!                   |
//!              angular < 0
//! ```
//!
//! Ties fall as follows: forward straight is `FwdCcw`, reverse straight and
//! the all-zero demand are `RevCw`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Signs applied per quadrant, indexed by `Quadrant::index`.
const SIGN_TABLE: [QuadrantSigns; 4] = [
    QuadrantSigns::new(1.0, 1.0, 1.0, 1.0),
    QuadrantSigns::new(-1.0, -1.0, 1.0, 1.0),
    QuadrantSigns::new(-1.0, -1.0, -1.0, -1.0),
    QuadrantSigns::new(1.0, 1.0, -1.0, -1.0),
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Signs applied to the left/right steering angles and wheel rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadrantSigns {
    pub str_left: f64,
    pub str_right: f64,
    pub drv_left: f64,
    pub drv_right: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quadrant {
    /// Forward, turning counter-clockwise (or straight).
    FwdCcw,
    /// Forward, turning clockwise.
    FwdCw,
    /// Reverse, turning counter-clockwise.
    RevCcw,
    /// Reverse, turning clockwise (or straight, or stopped).
    RevCw,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl QuadrantSigns {
    const fn new(str_left: f64, str_right: f64, drv_left: f64, drv_right: f64) -> Self {
        Self {
            str_left,
            str_right,
            drv_left,
            drv_right,
        }
    }
}

impl Quadrant {
    /// Classify a (linear, angular) pair.
    ///
    /// The same classification is applied to measured (wheel rate, steering
    /// angle) pairs when reducing feedback.
    pub fn classify(linear: f64, angular: f64) -> Self {
        if linear > 0.0 {
            if angular >= 0.0 {
                Quadrant::FwdCcw
            } else {
                Quadrant::FwdCw
            }
        } else if angular > 0.0 {
            Quadrant::RevCcw
        } else {
            Quadrant::RevCw
        }
    }

    pub fn index(self) -> usize {
        match self {
            Quadrant::FwdCcw => 0,
            Quadrant::FwdCw => 1,
            Quadrant::RevCcw => 2,
            Quadrant::RevCw => 3,
        }
    }

    pub fn signs(self) -> QuadrantSigns {
        SIGN_TABLE[self.index()]
    }

    /// True if the near side of the turn is the left side.
    pub fn near_is_left(self) -> bool {
        matches!(self, Quadrant::FwdCcw | Quadrant::RevCw)
    }

    /// +1 for the forward quadrants, -1 otherwise.
    pub fn drive_sign(self) -> f64 {
        match self {
            Quadrant::FwdCcw | Quadrant::FwdCw => 1.0,
            Quadrant::RevCcw | Quadrant::RevCw => -1.0,
        }
    }

    /// +1 for the counter-clockwise quadrants, -1 otherwise.
    pub fn turn_sign(self) -> f64 {
        match self {
            Quadrant::FwdCcw | Quadrant::RevCcw => 1.0,
            Quadrant::FwdCw | Quadrant::RevCw => -1.0,
        }
    }

    /// Map a (near, far) pair onto (left, right).
    pub fn near_far_to_left_right<T>(self, near: T, far: T) -> (T, T) {
        if self.near_is_left() {
            (near, far)
        } else {
            (far, near)
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(Quadrant::classify(1.0, 0.5), Quadrant::FwdCcw);
        assert_eq!(Quadrant::classify(1.0, -0.5), Quadrant::FwdCw);
        assert_eq!(Quadrant::classify(-1.0, 0.5), Quadrant::RevCcw);
        assert_eq!(Quadrant::classify(-1.0, -0.5), Quadrant::RevCw);
    }

    #[test]
    fn test_ties() {
        assert_eq!(Quadrant::classify(1.0, 0.0), Quadrant::FwdCcw);
        assert_eq!(Quadrant::classify(-1.0, 0.0), Quadrant::RevCw);
        assert_eq!(Quadrant::classify(0.0, 0.0), Quadrant::RevCw);
        assert_eq!(Quadrant::classify(0.0, 0.5), Quadrant::RevCcw);
    }

    #[test]
    fn test_sign_table() {
        assert_eq!(
            Quadrant::FwdCcw.signs(),
            QuadrantSigns::new(1.0, 1.0, 1.0, 1.0)
        );
        assert_eq!(
            Quadrant::FwdCw.signs(),
            QuadrantSigns::new(-1.0, -1.0, 1.0, 1.0)
        );
        assert_eq!(
            Quadrant::RevCcw.signs(),
            QuadrantSigns::new(-1.0, -1.0, -1.0, -1.0)
        );
        assert_eq!(
            Quadrant::RevCw.signs(),
            QuadrantSigns::new(1.0, 1.0, -1.0, -1.0)
        );

        // Drive signs in the table agree with the quadrant's direction
        for q in [
            Quadrant::FwdCcw,
            Quadrant::FwdCw,
            Quadrant::RevCcw,
            Quadrant::RevCw,
        ]
        .iter()
        {
            assert_eq!(q.signs().drv_left, q.drive_sign());
            assert_eq!(q.signs().drv_right, q.drive_sign());
        }
    }

    #[test]
    fn test_near_far_mapping() {
        assert_eq!(Quadrant::FwdCcw.near_far_to_left_right("n", "f"), ("n", "f"));
        assert_eq!(Quadrant::RevCw.near_far_to_left_right("n", "f"), ("n", "f"));
        assert_eq!(Quadrant::FwdCw.near_far_to_left_right("n", "f"), ("f", "n"));
        assert_eq!(Quadrant::RevCcw.near_far_to_left_right("n", "f"), ("f", "n"));
    }
}
