//! Measurement log
//!
//! Rows follow a fixed schema: aligned time, three acceleration axes per
//! device, and a valve position snapshot.

pub mod row;
pub mod sink;

pub use row::{DeviceId, Row, COLUMNS, COLUMN_COUNT, LOGGED_AXES, MAX_DEVICES, TIME_COLUMN, VALVE_COLUMN};
pub use sink::{LogError, LogSink};
