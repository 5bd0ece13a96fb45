//! Log output traits
//!
//! `RowWriter` is the persistence capability (a CSV file on the rig, a
//! vector in tests). `SampleSink` is what an acquisition loop hands its
//! decoded readings to.

use crate::datalog::{DeviceId, Row};
use crate::registers::Reading;

/// Destination for finished log rows
pub trait RowWriter {
    /// Persistence error
    type Error;

    /// Write the column header; called once before any row
    fn write_header(&mut self, columns: &[&str]) -> Result<(), Self::Error>;

    /// Append one row
    fn write_row(&mut self, row: &Row) -> Result<(), Self::Error>;

    /// Flush buffered rows
    fn finish(&mut self) -> Result<(), Self::Error>;
}

/// Consumer of decoded sensor readings
pub trait SampleSink {
    /// Logging error
    type Error;

    /// Capture the device's time offset from its first reading
    fn sync(&mut self, device: DeviceId, reading: &Reading) -> Result<(), Self::Error>;

    /// Record one reading
    fn log(&mut self, device: DeviceId, reading: &Reading) -> Result<(), Self::Error>;
}

impl<T: SampleSink + ?Sized> SampleSink for &mut T {
    type Error = T::Error;

    fn sync(&mut self, device: DeviceId, reading: &Reading) -> Result<(), Self::Error> {
        T::sync(self, device, reading)
    }

    fn log(&mut self, device: DeviceId, reading: &Reading) -> Result<(), Self::Error> {
        T::log(self, device, reading)
    }
}
