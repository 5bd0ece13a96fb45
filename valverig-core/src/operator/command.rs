//! Line-oriented command parsing
//!
//! What a line means depends on the valve mode: in positioning a number
//! is an opening percentage, in calibration it is a signed step count.

use core::fmt;

use crate::state::Mode;

/// Usage hint for positioning mode
pub const USAGE: &str =
    "commands: <0-100> move to percentage, c calibrate, s status, q quit, ? help";

/// Usage hint for calibration mode
pub const CALIBRATION_USAGE: &str =
    "calibration: <steps> jog (negative closes), s status, q leave calibration";

/// A parsed operator command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Park the valve closed and shut down
    Quit,
    /// Enter manual calibration
    Calibrate,
    /// Move to an opening percentage
    MoveTo(f64),
    /// Jog by a signed number of steps (calibration)
    Jog(i32),
    /// Leave calibration, re-zeroing the position
    ExitCalibration,
    /// Print mode and position
    Status,
    /// Print usage
    Help,
}

/// Rejected operator input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line
    Empty,
    /// Not a command in the current mode
    Unrecognized(Mode),
    /// The rig is shutting down
    ShuttingDown,
}

impl CommandError {
    /// Usage hint to show the operator
    pub fn usage(&self) -> &'static str {
        match self {
            CommandError::Unrecognized(Mode::Calibration) => CALIBRATION_USAGE,
            _ => USAGE,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::Unrecognized(mode) => {
                write!(f, "unrecognized command in {} mode", mode.name())
            }
            CommandError::ShuttingDown => write!(f, "shutting down, commands ignored"),
        }
    }
}

/// Parse one console line in the context of `mode`
pub fn parse(line: &str, mode: Mode) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Empty);
    }

    match mode {
        Mode::Positioning => match line {
            "q" | "Q" => Ok(Command::Quit),
            "c" | "C" => Ok(Command::Calibrate),
            "s" | "S" => Ok(Command::Status),
            "?" | "help" => Ok(Command::Help),
            _ => match line.parse::<f64>() {
                Ok(percent) if percent.is_finite() => Ok(Command::MoveTo(percent)),
                _ => Err(CommandError::Unrecognized(mode)),
            },
        },
        Mode::Calibration => match line {
            "q" | "Q" => Ok(Command::ExitCalibration),
            "s" | "S" => Ok(Command::Status),
            "?" | "help" => Ok(Command::Help),
            _ => line
                .parse::<i32>()
                .map(Command::Jog)
                .map_err(|_| CommandError::Unrecognized(mode)),
        },
        Mode::Terminating => Err(CommandError::ShuttingDown),
    }
}
