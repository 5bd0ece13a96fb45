//! Board-agnostic core logic for the valve test rig
//!
//! This crate contains all rig logic that does not depend on specific
//! hardware implementations:
//!
//! - Sensor register catalog and read planning
//! - Valve position math, step timing and shared actuator state
//! - Mode state machine (positioning, calibration, terminating)
//! - Time-aligned log sink
//! - Operator command parsing
//! - Cooperative shutdown primitives
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod datalog;
pub mod motion;
pub mod operator;
pub mod registers;
pub mod safety;
pub mod scheduler;
pub mod state;
pub mod traits;
