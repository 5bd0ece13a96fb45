//! Hardware driver implementations
//!
//! This crate provides the drivers the rig tasks run on top of the
//! `valverig-hal` capability traits:
//!
//! - Register transports (SPI with turnaround byte, I2C)
//! - BMI160 inertial sensor: bring-up, offset compensation, planned reads
//! - Acquisition loop feeding a sample sink
//! - Step/dir valve actuator driving the shared valve state

#![no_std]
#![deny(unsafe_code)]

pub mod sensor;
pub mod stepper;
