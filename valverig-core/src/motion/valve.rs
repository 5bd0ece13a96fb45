//! Shared valve actuator state
//!
//! One `ValveState` is shared by the motor task and the console task.
//! Every field is an atomic with a single writer:
//!
//! - `current`: motor task (steps taken), console only on calibration exit
//! - `target`, `mode`, `pending_jog`: console task
//! - `jog_active`: motor task
//!
//! Readers poll and recheck on their next iteration, so no lock is ever
//! held across a suspension point.

use core::fmt;

use embedded_hal_async::delay::DelayNs;
use portable_atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU8, Ordering};

use super::position::{percent_to_steps, PositionTarget};
use super::MotionAction;
use crate::scheduler::TerminateSignal;
use crate::state::{Event, Mode};
use crate::traits::stepper::Direction;

/// Interval between position checks while parking for shutdown
pub const QUIT_POLL_MS: u32 = 100;

/// Errors from valve commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveError {
    /// Command needs Positioning mode
    NotPositioning(Mode),
    /// Command needs Calibration mode
    NotCalibrating(Mode),
    /// A calibration jog has not finished yet
    JogInProgress,
}

impl fmt::Display for ValveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValveError::NotPositioning(mode) => {
                write!(f, "valve is in {} mode, not positioning", mode.name())
            }
            ValveError::NotCalibrating(mode) => {
                write!(f, "valve is in {} mode, not calibration", mode.name())
            }
            ValveError::JogInProgress => write!(f, "calibration jog still running"),
        }
    }
}

/// Point-in-time copy of the valve state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValveSnapshot {
    pub mode: Mode,
    pub current: i32,
    pub target: i32,
    pub max_position: i32,
    pub rpm: u32,
}

/// Lock-free valve state shared between tasks
#[derive(Debug)]
pub struct ValveState {
    current: AtomicI32,
    target: AtomicI32,
    mode: AtomicU8,
    rpm: AtomicU32,
    pending_jog: AtomicI32,
    jog_active: AtomicBool,
    max_position: i32,
}

impl ValveState {
    /// Valve at the closed position, Positioning mode
    pub const fn new(max_position: i32, rpm: u32) -> Self {
        Self {
            current: AtomicI32::new(0),
            target: AtomicI32::new(0),
            mode: AtomicU8::new(Mode::Positioning as u8),
            rpm: AtomicU32::new(rpm),
            pending_jog: AtomicI32::new(0),
            jog_active: AtomicBool::new(false),
            max_position,
        }
    }

    /// Steps from the closed position
    pub fn current(&self) -> i32 {
        self.current.load(Ordering::Acquire)
    }

    /// Position the motion cycle is driving towards
    pub fn target(&self) -> i32 {
        self.target.load(Ordering::Acquire)
    }

    /// Current operating mode
    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Motor speed
    pub fn rpm(&self) -> u32 {
        self.rpm.load(Ordering::Relaxed)
    }

    /// Fully open position in steps
    pub fn max_position(&self) -> i32 {
        self.max_position
    }

    /// Consistent-enough copy for status output
    pub fn snapshot(&self) -> ValveSnapshot {
        ValveSnapshot {
            mode: self.mode(),
            current: self.current(),
            target: self.target(),
            max_position: self.max_position,
            rpm: self.rpm(),
        }
    }

    /// Set the target from an opening percentage
    ///
    /// Out-of-range requests are clamped, never rejected; the returned
    /// target reports which bound was applied.
    pub fn move_to_percentage(&self, percent: f64) -> Result<PositionTarget, ValveError> {
        let mode = self.mode();
        if mode != Mode::Positioning {
            return Err(ValveError::NotPositioning(mode));
        }
        let target = percent_to_steps(percent, self.max_position);
        self.target.store(target.steps, Ordering::Release);
        Ok(target)
    }

    /// What the motion cycle should do next
    pub fn next_action(&self) -> MotionAction {
        if self.mode().tracks_target() {
            super::next_action(self.current(), self.target())
        } else {
            MotionAction::Hold
        }
    }

    /// Account for one step taken by the motor task
    pub fn record_step(&self, direction: Direction) {
        self.current.fetch_add(direction.delta(), Ordering::AcqRel);
    }

    /// Suspend positioning and enter manual calibration
    pub fn enter_calibration(&self) -> Result<(), ValveError> {
        self.apply(Event::EnterCalibration)
            .map_err(ValveError::NotPositioning)
    }

    /// Ask the motor task to move `steps` unchecked (signed)
    pub fn request_jog(&self, steps: i32) -> Result<(), ValveError> {
        let mode = self.mode();
        if mode != Mode::Calibration {
            return Err(ValveError::NotCalibrating(mode));
        }
        if self.jog_in_progress() {
            return Err(ValveError::JogInProgress);
        }
        self.pending_jog.store(steps, Ordering::Release);
        Ok(())
    }

    /// Claim the pending jog, marking it active (motor task)
    pub fn take_jog(&self) -> Option<i32> {
        // Raise the active flag before clearing pending so
        // `jog_in_progress` never observes a gap
        self.jog_active.store(true, Ordering::Release);
        match self.pending_jog.swap(0, Ordering::AcqRel) {
            0 => {
                self.jog_active.store(false, Ordering::Release);
                None
            }
            steps => Some(steps),
        }
    }

    /// Mark the claimed jog as done (motor task)
    pub fn finish_jog(&self) {
        self.jog_active.store(false, Ordering::Release);
    }

    /// Whether a requested jog has not completed
    pub fn jog_in_progress(&self) -> bool {
        self.jog_active.load(Ordering::Acquire) || self.pending_jog.load(Ordering::Acquire) != 0
    }

    /// Leave calibration; the valve is taken to be closed
    ///
    /// Current and target are both reset to zero before positioning
    /// resumes, so the motion cycle sees no error to correct.
    pub fn exit_calibration(&self) -> Result<(), ValveError> {
        let mode = self.mode();
        if mode != Mode::Calibration {
            return Err(ValveError::NotCalibrating(mode));
        }
        if self.jog_in_progress() {
            return Err(ValveError::JogInProgress);
        }
        self.current.store(0, Ordering::Release);
        self.target.store(0, Ordering::Release);
        self.apply(Event::ExitCalibration)
            .map_err(ValveError::NotCalibrating)
    }

    /// Park the valve closed, then stop every task
    ///
    /// Sets the target to zero and polls until the motor task reports the
    /// valve closed (or something else already raised `terminate`). Only
    /// then is the mode set to Terminating and the signal raised.
    pub async fn quit<D: DelayNs>(
        &self,
        terminate: &TerminateSignal,
        delay: &mut D,
    ) -> Result<(), ValveError> {
        let mode = self.mode();
        if mode != Mode::Positioning {
            return Err(ValveError::NotPositioning(mode));
        }

        self.target.store(0, Ordering::Release);
        while self.current() != 0 && !terminate.is_raised() {
            delay.delay_ms(QUIT_POLL_MS).await;
        }

        self.apply(Event::Terminate)
            .map_err(ValveError::NotPositioning)?;
        terminate.raise();
        Ok(())
    }

    fn apply(&self, event: Event) -> Result<(), Mode> {
        let mode = self.mode();
        let next = mode.transition(event).ok_or(mode)?;
        self.mode
            .compare_exchange(mode as u8, next as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| Mode::from_u8(actual).unwrap_or_default())
    }
}
