//! Operator console commands

pub mod command;

pub use command::{parse, Command, CommandError, CALIBRATION_USAGE, USAGE};
