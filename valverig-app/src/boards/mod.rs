//! Board backends
//!
//! A board turns the rig configuration into concrete pins and sensor
//! buses. Tasks are written against the aliases exported here.

pub mod sim;

pub use sim::{Sensor, SimBoard, Valve};
