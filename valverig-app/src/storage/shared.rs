//! Log sink shared by the acquisition tasks
//!
//! Appends never suspend, so holding the lock for one row cannot stall
//! another task on the single-threaded executor.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use valverig_core::datalog::{DeviceId, LogError, LogSink};
use valverig_core::motion::ValveState;
use valverig_core::registers::Reading;
use valverig_core::traits::{RowWriter, SampleSink};

/// Holder for the session's log sink
pub struct LogSlot<W> {
    sink: Mutex<CriticalSectionRawMutex, RefCell<Option<LogSink<W>>>>,
}

impl<W: RowWriter> LogSlot<W> {
    /// Empty slot
    pub const fn new() -> Self {
        Self {
            sink: Mutex::new(RefCell::new(None)),
        }
    }

    /// Install an opened sink, returning any previous one
    pub fn install(&self, sink: LogSink<W>) -> Option<LogSink<W>> {
        self.sink.lock(|cell| cell.borrow_mut().replace(sink))
    }

    /// Remove the sink for finalisation
    pub fn take(&self) -> Option<LogSink<W>> {
        self.sink.lock(|cell| cell.borrow_mut().take())
    }

    /// Rows appended so far
    pub fn rows_written(&self) -> u64 {
        self.sink
            .lock(|cell| cell.borrow().as_ref().map_or(0, LogSink::rows_written))
    }

    fn with<R>(
        &self,
        f: impl FnOnce(&mut LogSink<W>) -> Result<R, LogError<W::Error>>,
    ) -> Result<R, LogError<W::Error>> {
        self.sink.lock(|cell| match cell.borrow_mut().as_mut() {
            Some(sink) => f(sink),
            None => Err(LogError::NotStarted),
        })
    }
}

/// One acquisition task's handle on the shared log
///
/// With a valve attached, every row carries a position snapshot.
pub struct SharedLog<'a, W> {
    slot: &'a LogSlot<W>,
    valve: Option<&'a ValveState>,
}

impl<'a, W: RowWriter> SharedLog<'a, W> {
    /// Handle writing plain sensor rows
    pub fn new(slot: &'a LogSlot<W>) -> Self {
        Self { slot, valve: None }
    }

    /// Handle that also snapshots the valve position
    pub fn with_valve(slot: &'a LogSlot<W>, valve: &'a ValveState) -> Self {
        Self {
            slot,
            valve: Some(valve),
        }
    }
}

impl<W: RowWriter> SampleSink for SharedLog<'_, W> {
    type Error = LogError<W::Error>;

    fn sync(&mut self, device: DeviceId, reading: &Reading) -> Result<(), Self::Error> {
        self.slot.with(|sink| SampleSink::sync(sink, device, reading))
    }

    fn log(&mut self, device: DeviceId, reading: &Reading) -> Result<(), Self::Error> {
        match self.valve {
            Some(valve) => {
                let position = valve.current();
                self.slot
                    .with(|sink| sink.log_with_valve(device, reading, position))
            }
            None => self.slot.with(|sink| sink.log(device, reading)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CsvRowWriter;
    use valverig_core::traits::Direction;
    use valverig_core::registers::Field;

    fn reading(time: f64, x: f64) -> Reading {
        Reading::new()
            .with(Field::Time, time)
            .with(Field::AccelX, x)
            .with(Field::AccelY, 0.0)
            .with(Field::AccelZ, 1.0)
    }

    fn opened() -> LogSink<CsvRowWriter<Vec<u8>>> {
        let mut sink = LogSink::new(CsvRowWriter::from_writer(Vec::new()));
        sink.start().unwrap();
        sink
    }

    fn finish(slot: &LogSlot<CsvRowWriter<Vec<u8>>>) -> String {
        let writer = slot.take().unwrap().end().unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_two_devices_share_one_timeline() {
        let slot = LogSlot::new();
        assert!(slot.install(opened()).is_none());

        let d0 = DeviceId::new(0).unwrap();
        let d1 = DeviceId::new(1).unwrap();
        let mut log0 = SharedLog::new(&slot);
        let mut log1 = SharedLog::new(&slot);

        log0.sync(d0, &reading(100.0, 0.1)).unwrap();
        log0.log(d0, &reading(100.0, 0.1)).unwrap();
        log1.sync(d1, &reading(7.0, 0.2)).unwrap();
        log1.log(d1, &reading(7.0, 0.2)).unwrap();
        log0.log(d0, &reading(100.01, 0.3)).unwrap();
        assert_eq!(slot.rows_written(), 3);

        let text = finish(&slot);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "0,0.1,0,1,,,,");
        assert_eq!(lines[2], "0,,,,0.2,0,1,");
        assert!(lines[3].starts_with("0.0100"));
        assert!(lines[3].ends_with(",0.3,0,1,,,,"));
    }

    #[test]
    fn test_valve_snapshot_column() {
        let slot = LogSlot::new();
        slot.install(opened());
        let valve = ValveState::new(1818, 100);
        valve.record_step(Direction::Opening);
        valve.record_step(Direction::Opening);

        let device = DeviceId::new(0).unwrap();
        let mut log = SharedLog::with_valve(&slot, &valve);
        log.sync(device, &reading(1.0, 0.5)).unwrap();
        log.log(device, &reading(1.0, 0.5)).unwrap();

        let text = finish(&slot);
        assert_eq!(text.lines().nth(1), Some("0,0.5,0,1,,,,2"));
    }

    #[test]
    fn test_closed_slot_rejects_rows() {
        let slot: LogSlot<CsvRowWriter<Vec<u8>>> = LogSlot::new();
        let device = DeviceId::new(0).unwrap();
        let mut log = SharedLog::new(&slot);
        assert!(matches!(
            log.log(device, &reading(1.0, 0.0)),
            Err(LogError::NotStarted)
        ));
    }
}
