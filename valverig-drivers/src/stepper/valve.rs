//! Step/dir valve actuator
//!
//! Drives a step/dir/enable stepper driver from the shared [`ValveState`].
//! The motor task owns the actuator and is the only code that touches the
//! pins; everything else talks to it through the state.
//!
//! # Motion cycle
//!
//! Positioning: one step towards the target per cycle, or disable the
//! driver and idle for two step periods when on target. Calibration: run
//! a requested jog (enable, settle, N unchecked steps, disable) or idle.
//! Speed is re-read every cycle so a change applies on the next step.

use embedded_hal_async::delay::DelayNs;
use valverig_core::config::ValveHwConfig;
use valverig_core::motion::{MotionAction, StepTiming, ValveState};
use valverig_core::scheduler::TerminateSignal;
use valverig_core::state::Mode;
use valverig_core::traits::Direction;
use valverig_hal::OutputPin;

/// Driver enable settling time before a calibration jog
pub const ENABLE_SETTLE_MS: u32 = 50;

/// Idle wait in calibration with nothing to do
pub const CALIBRATION_POLL_MS: u32 = 100;

/// What one motion cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Took one positioning step
    Stepped(Direction),
    /// On target, driver disabled
    Idle,
    /// Ran a calibration jog of this many steps (signed)
    Jogged(i32),
    /// Calibration with no jog pending
    Waiting,
}

/// Valve stepper on three output pins
pub struct ValveActuator<STEP, DIR, EN> {
    step: STEP,
    dir: DIR,
    enable: EN,
    step_inverted: bool,
    dir_inverted: bool,
    enable_inverted: bool,
    steps_per_revolution: u32,
    enabled: bool,
}

impl<STEP, DIR, EN> ValveActuator<STEP, DIR, EN>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    /// Create the actuator with the driver disabled and step low
    pub fn new(step: STEP, dir: DIR, enable: EN, config: &ValveHwConfig) -> Self {
        let mut actuator = Self {
            step,
            dir,
            enable,
            step_inverted: config.step_pin.inverted,
            dir_inverted: config.dir_pin.inverted,
            enable_inverted: config.enable_pin.inverted,
            steps_per_revolution: config.steps_per_revolution(),
            enabled: true,
        };
        actuator.set_step(false);
        actuator.set_enabled(false);
        actuator
    }

    /// Whether the driver is currently enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the driver (logical level; polarity from config)
    pub fn set_enabled(&mut self, on: bool) {
        if on != self.enabled {
            self.enabled = on;
            drive(&mut self.enable, on, self.enable_inverted);
        }
    }

    /// Set the direction line; opening is low unless the pin is inverted
    pub fn set_direction(&mut self, direction: Direction) {
        drive(
            &mut self.dir,
            direction == Direction::Closing,
            self.dir_inverted,
        );
    }

    /// One full step pulse
    pub async fn step<D: DelayNs>(&mut self, direction: Direction, timing: StepTiming, delay: &mut D) {
        self.set_enabled(true);
        self.set_direction(direction);
        self.set_step(true);
        delay.delay_ns(timing.half_period_ns()).await;
        self.set_step(false);
        delay.delay_ns(timing.half_period_ns()).await;
    }

    /// Move `steps` (signed) without position tracking
    ///
    /// Stops early if `terminate` is raised. Returns the signed number of
    /// steps actually taken.
    pub async fn jog<D: DelayNs>(
        &mut self,
        steps: i32,
        timing: StepTiming,
        terminate: &TerminateSignal,
        delay: &mut D,
    ) -> i32 {
        let Some(direction) = Direction::of_steps(steps) else {
            return 0;
        };

        self.set_enabled(true);
        delay.delay_ms(ENABLE_SETTLE_MS).await;

        let mut taken = 0;
        for _ in 0..steps.unsigned_abs() {
            if terminate.is_raised() {
                break;
            }
            self.step(direction, timing, delay).await;
            taken += direction.delta();
        }

        self.set_enabled(false);
        taken
    }

    /// Run one motion cycle against the shared state
    pub async fn cycle<D: DelayNs>(
        &mut self,
        state: &ValveState,
        terminate: &TerminateSignal,
        delay: &mut D,
    ) -> CycleOutcome {
        let Some(timing) = StepTiming::from_rpm(self.steps_per_revolution, state.rpm()) else {
            // No usable speed: hold still and check again later
            self.set_enabled(false);
            delay.delay_ms(CALIBRATION_POLL_MS).await;
            return CycleOutcome::Idle;
        };

        if state.mode() == Mode::Calibration {
            return match state.take_jog() {
                Some(steps) => {
                    let taken = self.jog(steps, timing, terminate, delay).await;
                    state.finish_jog();
                    CycleOutcome::Jogged(taken)
                }
                None => {
                    self.set_enabled(false);
                    delay.delay_ms(CALIBRATION_POLL_MS).await;
                    CycleOutcome::Waiting
                }
            };
        }

        match state.next_action() {
            MotionAction::Step(direction) => {
                self.step(direction, timing, delay).await;
                state.record_step(direction);
                CycleOutcome::Stepped(direction)
            }
            MotionAction::Hold => {
                self.set_enabled(false);
                delay.delay_ns(timing.idle_ns()).await;
                CycleOutcome::Idle
            }
        }
    }

    /// Motion loop: cycle until `terminate` is raised, then disable
    ///
    /// Returns the number of positioning steps taken.
    pub async fn run<D: DelayNs>(
        &mut self,
        state: &ValveState,
        terminate: &TerminateSignal,
        delay: &mut D,
    ) -> u64 {
        let mut steps = 0;
        while !terminate.is_raised() {
            if let CycleOutcome::Stepped(_) = self.cycle(state, terminate, delay).await {
                steps += 1;
            }
        }
        self.set_enabled(false);
        steps
    }

    fn set_step(&mut self, high: bool) {
        drive(&mut self.step, high, self.step_inverted);
    }
}

fn drive<P: OutputPin>(pin: &mut P, active: bool, inverted: bool) {
    pin.set_state(active != inverted);
}
