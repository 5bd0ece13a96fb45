//! Stepper motion primitives shared by the valve state machine and the
//! step/dir actuator

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Valve travel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Direction {
    /// Towards fully open (position increases)
    Opening,
    /// Towards fully closed (position decreases)
    Closing,
}

impl Direction {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Opening => Direction::Closing,
            Direction::Closing => Direction::Opening,
        }
    }

    /// Position change of one step in this direction
    pub fn delta(self) -> i32 {
        match self {
            Direction::Opening => 1,
            Direction::Closing => -1,
        }
    }

    /// Direction of a signed step count, `None` for zero
    pub fn of_steps(steps: i32) -> Option<Self> {
        match steps {
            0 => None,
            s if s > 0 => Some(Direction::Opening),
            _ => Some(Direction::Closing),
        }
    }
}
