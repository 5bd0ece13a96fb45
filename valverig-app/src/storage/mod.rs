//! Measurement log persistence
//!
//! One CSV file per session, created before any task starts.

pub mod csv;
pub mod shared;

pub use self::csv::{CsvRowWriter, StorageError};
pub use self::shared::{LogSlot, SharedLog};
