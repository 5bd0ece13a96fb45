//! Capability traits
//!
//! These traits define the interface between the rig logic and the
//! concrete sinks and drivers supplied by the application.

pub mod sink;
pub mod stepper;

pub use sink::{RowWriter, SampleSink};
pub use stepper::Direction;
