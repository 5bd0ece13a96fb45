//! Stepper driver implementations

pub mod valve;

pub use valve::{CycleOutcome, ValveActuator, CALIBRATION_POLL_MS, ENABLE_SETTLE_MS};
