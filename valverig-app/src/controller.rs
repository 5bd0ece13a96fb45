//! Operator command handling
//!
//! Turns console lines into valve operations and describes the outcome
//! for the operator. Only the motor task drives pins; the controller works
//! on the shared [`ValveState`] and waits for the motor task where a
//! command has to complete before the next one is read.

use core::fmt;

use embedded_hal_async::delay::DelayNs;

use valverig_core::motion::{steps_to_percent, Clamp, PositionTarget, ValveError, ValveSnapshot, ValveState};
use valverig_core::operator::{parse, Command, CommandError, CALIBRATION_USAGE, USAGE};
use valverig_core::scheduler::TerminateSignal;
use valverig_core::state::Mode;

/// Poll interval while a calibration jog runs (ms)
pub const JOG_POLL_MS: u32 = 10;

/// Outcome of one operator command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    /// New target accepted
    Moving { percent: f64, target: PositionTarget },
    /// Calibration mode entered
    Calibrating,
    /// Jog finished
    Jogged(i32),
    /// Calibration left; position re-zeroed
    Zeroed,
    /// Current state
    Status(ValveSnapshot),
    /// Usage requested
    Help(Mode),
    /// Input not understood; nothing changed
    Rejected(CommandError),
    /// Command not allowed right now; nothing changed
    Refused(ValveError),
    /// Valve closed and every task told to stop
    Parked,
}

impl Reply {
    /// Whether the console should stop reading
    pub fn is_final(&self) -> bool {
        matches!(self, Reply::Parked)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Moving { percent, target } => {
                write!(f, "moving to {} steps", target.steps)?;
                match target.clamped {
                    Some(Clamp::Minimum) => write!(f, " ({} % clamped to 0 %)", percent),
                    Some(Clamp::Maximum) => write!(f, " ({} % clamped to 100 %)", percent),
                    None => write!(f, " ({} %)", percent),
                }
            }
            Reply::Calibrating => write!(
                f,
                "calibration mode: jog the valve closed, then leave with q\n{}",
                CALIBRATION_USAGE
            ),
            Reply::Jogged(steps) => write!(f, "jogged {} steps", steps),
            Reply::Zeroed => write!(f, "calibration done, valve position set to closed"),
            Reply::Status(s) => write!(
                f,
                "mode {}, position {}/{} steps ({:.1} %), target {}, {} rpm",
                s.mode.name(),
                s.current,
                s.max_position,
                steps_to_percent(s.current, s.max_position),
                s.target,
                s.rpm
            ),
            Reply::Help(Mode::Calibration) => write!(f, "{}", CALIBRATION_USAGE),
            Reply::Help(_) => write!(f, "{}", USAGE),
            Reply::Rejected(e) => write!(f, "{}\n{}", e, e.usage()),
            Reply::Refused(e) => write!(f, "{}", e),
            Reply::Parked => write!(f, "valve closed, shutting down"),
        }
    }
}

/// Executes operator commands against the shared valve state
pub struct Controller<'a> {
    valve: &'a ValveState,
    terminate: &'a TerminateSignal,
}

impl<'a> Controller<'a> {
    pub fn new(valve: &'a ValveState, terminate: &'a TerminateSignal) -> Self {
        Self { valve, terminate }
    }

    /// Parse and execute one console line
    pub async fn handle_line<D: DelayNs>(&self, line: &str, delay: &mut D) -> Reply {
        match parse(line, self.valve.mode()) {
            Ok(command) => self.execute(command, delay).await,
            Err(e) => Reply::Rejected(e),
        }
    }

    /// Execute a parsed command
    pub async fn execute<D: DelayNs>(&self, command: Command, delay: &mut D) -> Reply {
        let result = match command {
            Command::MoveTo(percent) => self
                .valve
                .move_to_percentage(percent)
                .map(|target| Reply::Moving { percent, target }),
            Command::Calibrate => self.valve.enter_calibration().map(|()| Reply::Calibrating),
            Command::Jog(steps) => match self.valve.request_jog(steps) {
                Ok(()) => {
                    self.wait_for_jog(delay).await;
                    Ok(Reply::Jogged(steps))
                }
                Err(e) => Err(e),
            },
            Command::ExitCalibration => self.valve.exit_calibration().map(|()| Reply::Zeroed),
            Command::Status => Ok(Reply::Status(self.valve.snapshot())),
            Command::Help => Ok(Reply::Help(self.valve.mode())),
            Command::Quit => self
                .valve
                .quit(self.terminate, delay)
                .await
                .map(|()| Reply::Parked),
        };
        result.unwrap_or_else(Reply::Refused)
    }

    /// Shut down after the console input closed
    ///
    /// A pending calibration is finished first, which takes the valve to
    /// be closed, then the valve is parked as for `q`.
    pub async fn shutdown<D: DelayNs>(&self, delay: &mut D) -> Reply {
        if self.valve.mode() == Mode::Calibration {
            self.wait_for_jog(delay).await;
            if let Err(e) = self.valve.exit_calibration() {
                return Reply::Refused(e);
            }
        }
        self.execute(Command::Quit, delay).await
    }

    async fn wait_for_jog<D: DelayNs>(&self, delay: &mut D) {
        while self.valve.jog_in_progress() && !self.terminate.is_raised() {
            delay.delay_ms(JOG_POLL_MS).await;
        }
    }
}
