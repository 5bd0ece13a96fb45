//! Valve mode state machine
//!
//! Motion behaviour is a function of the current mode. Transitions are
//! pure so they can be checked before the shared state is touched.

use super::events::Event;

/// Valve operating modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Mode {
    /// Closed-loop positioning towards the target
    #[default]
    Positioning = 0,
    /// Manual jogging, position tracking suspended
    Calibration = 1,
    /// Shutting down; no new commands are accepted
    Terminating = 2,
}

impl Mode {
    /// Mode reached from `self` on `event`, `None` if the event is not
    /// valid here
    pub fn transition(self, event: Event) -> Option<Mode> {
        match (self, event) {
            (Mode::Positioning, Event::EnterCalibration) => Some(Mode::Calibration),
            (Mode::Calibration, Event::ExitCalibration) => Some(Mode::Positioning),
            (Mode::Positioning, Event::Terminate) => Some(Mode::Terminating),
            _ => None,
        }
    }

    /// Whether the motion cycle chases the target in this mode
    pub fn tracks_target(self) -> bool {
        matches!(self, Mode::Positioning | Mode::Terminating)
    }

    /// Short lowercase name for status output
    pub fn name(self) -> &'static str {
        match self {
            Mode::Positioning => "positioning",
            Mode::Calibration => "calibration",
            Mode::Terminating => "terminating",
        }
    }

    /// Decode from the atomic representation
    pub fn from_u8(value: u8) -> Option<Mode> {
        match value {
            0 => Some(Mode::Positioning),
            1 => Some(Mode::Calibration),
            2 => Some(Mode::Terminating),
            _ => None,
        }
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> u8 {
        mode as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_round_trip() {
        let mode = Mode::Positioning;
        let mode = mode.transition(Event::EnterCalibration).unwrap();
        assert_eq!(mode, Mode::Calibration);
        assert!(!mode.tracks_target());
        let mode = mode.transition(Event::ExitCalibration).unwrap();
        assert_eq!(mode, Mode::Positioning);
    }

    #[test]
    fn test_invalid_transitions() {
        assert_eq!(Mode::Calibration.transition(Event::EnterCalibration), None);
        assert_eq!(Mode::Calibration.transition(Event::Terminate), None);
        assert_eq!(Mode::Positioning.transition(Event::ExitCalibration), None);
        assert_eq!(Mode::Terminating.transition(Event::EnterCalibration), None);
    }

    #[test]
    fn test_u8_conversion() {
        for mode in [Mode::Positioning, Mode::Calibration, Mode::Terminating] {
            assert_eq!(Mode::from_u8(u8::from(mode)), Some(mode));
        }
        assert_eq!(Mode::from_u8(7), None);
    }
}
