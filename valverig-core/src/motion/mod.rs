//! Valve motion: geometry, timing and the shared position state

pub mod position;
pub mod timing;
pub mod valve;

pub use position::{percent_to_steps, steps_to_percent, Clamp, PositionTarget, ValveGeometry};
pub use timing::StepTiming;
pub use valve::{ValveError, ValveSnapshot, ValveState, QUIT_POLL_MS};

use crate::traits::stepper::Direction;

/// Decision for one motion cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionAction {
    /// Take one step
    Step(Direction),
    /// On target: disable the drive and idle
    Hold,
}

/// One step towards `target`, or hold when there
pub fn next_action(current: i32, target: i32) -> MotionAction {
    match current.cmp(&target) {
        core::cmp::Ordering::Less => MotionAction::Step(Direction::Opening),
        core::cmp::Ordering::Greater => MotionAction::Step(Direction::Closing),
        core::cmp::Ordering::Equal => MotionAction::Hold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_action() {
        assert_eq!(next_action(0, 5), MotionAction::Step(Direction::Opening));
        assert_eq!(next_action(5, 0), MotionAction::Step(Direction::Closing));
        assert_eq!(next_action(7, 7), MotionAction::Hold);
    }
}
