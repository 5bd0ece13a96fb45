//! Time-aligned log sink
//!
//! Each sensor runs its own free-running clock. The first sample a device
//! delivers after its acquisition task starts fixes that device's offset;
//! every later time value of the device is logged relative to it, which
//! puts both sensors on one timeline starting near zero.

use core::fmt;

use super::row::{DeviceId, Row, COLUMNS, LOGGED_AXES, MAX_DEVICES, TIME_COLUMN, VALVE_COLUMN};
use crate::registers::{Field, Reading};
use crate::traits::sink::{RowWriter, SampleSink};

/// Log sink usage and persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogError<E> {
    /// `start` has not been called
    NotStarted,
    /// `start` was called twice
    AlreadyStarted,
    /// The device's offset was already captured
    AlreadySynced(DeviceId),
    /// The device was never synced
    NotSynced(DeviceId),
    /// The reading has no TIME field
    MissingTime(DeviceId),
    /// The row writer failed
    Writer(E),
}

impl<E: fmt::Display> fmt::Display for LogError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::NotStarted => write!(f, "log not started"),
            LogError::AlreadyStarted => write!(f, "log already started"),
            LogError::AlreadySynced(d) => write!(f, "device {} already time-synced", d),
            LogError::NotSynced(d) => write!(f, "device {} logged before time sync", d),
            LogError::MissingTime(d) => write!(f, "device {} reading has no TIME field", d),
            LogError::Writer(e) => write!(f, "log write failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Open,
}

#[derive(Debug, Clone, Copy, Default)]
struct Clock {
    offset: f64,
    last: f64,
    wraps: u32,
}

/// Append-only, time-aligned row log
#[derive(Debug)]
pub struct LogSink<W> {
    writer: W,
    phase: Phase,
    clocks: [Option<Clock>; MAX_DEVICES],
    wrap_period: Option<f64>,
    rows: u64,
}

impl<W: RowWriter> LogSink<W> {
    /// Sink over `writer`; nothing is written until [`LogSink::start`]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            phase: Phase::Created,
            clocks: [None; MAX_DEVICES],
            wrap_period: None,
            rows: 0,
        }
    }

    /// Unwrap sensor clocks that roll over every `period` seconds
    ///
    /// Without this, a time value lower than the previous one for the same
    /// device is logged as is.
    pub fn with_time_wrap(mut self, period: f64) -> Self {
        self.wrap_period = Some(period);
        self
    }

    /// Open the row sequence and write the header
    pub fn start(&mut self) -> Result<(), LogError<W::Error>> {
        if self.phase != Phase::Created {
            return Err(LogError::AlreadyStarted);
        }
        self.writer
            .write_header(&COLUMNS)
            .map_err(LogError::Writer)?;
        self.phase = Phase::Open;
        Ok(())
    }

    /// Capture `device`'s time offset; allowed once per device
    pub fn sync_time(&mut self, device: DeviceId, time: f64) -> Result<(), LogError<W::Error>> {
        self.ensure_open()?;
        let clock = &mut self.clocks[device.index()];
        if clock.is_some() {
            return Err(LogError::AlreadySynced(device));
        }
        *clock = Some(Clock {
            offset: time,
            last: time,
            wraps: 0,
        });
        Ok(())
    }

    /// Append one row for `device`
    ///
    /// Fills the time column and the device's axis columns. Axes missing
    /// from the reading stay empty, as do the other device's columns and
    /// `VALVE`.
    pub fn log(&mut self, device: DeviceId, reading: &Reading) -> Result<(), LogError<W::Error>> {
        let row = self.build_row(device, reading)?;
        self.append(&row)
    }

    /// Like [`LogSink::log`] with a valve position snapshot in `VALVE`
    pub fn log_with_valve(
        &mut self,
        device: DeviceId,
        reading: &Reading,
        position: i32,
    ) -> Result<(), LogError<W::Error>> {
        let mut row = self.build_row(device, reading)?;
        row.set(VALVE_COLUMN, position as f64);
        self.append(&row)
    }

    /// Offset captured for `device`
    pub fn offset(&self, device: DeviceId) -> Option<f64> {
        self.clocks[device.index()].map(|c| c.offset)
    }

    /// Whether `start` has been called
    pub fn is_open(&self) -> bool {
        self.phase == Phase::Open
    }

    /// Rows appended so far, header excluded
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// The underlying writer
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Close the sequence, flush and hand back the writer
    pub fn end(mut self) -> Result<W, LogError<W::Error>> {
        self.ensure_open()?;
        self.writer.finish().map_err(LogError::Writer)?;
        Ok(self.writer)
    }

    fn ensure_open(&self) -> Result<(), LogError<W::Error>> {
        match self.phase {
            Phase::Open => Ok(()),
            Phase::Created => Err(LogError::NotStarted),
        }
    }

    fn build_row(&mut self, device: DeviceId, reading: &Reading) -> Result<Row, LogError<W::Error>> {
        self.ensure_open()?;
        let raw = reading.get(Field::Time).ok_or(LogError::MissingTime(device))?;
        let wrap_period = self.wrap_period;
        let clock = self.clocks[device.index()]
            .as_mut()
            .ok_or(LogError::NotSynced(device))?;

        if wrap_period.is_some() {
            if raw < clock.last {
                clock.wraps += 1;
            }
            clock.last = raw;
        }
        let unwrapped = raw + wrap_period.unwrap_or(0.0) * clock.wraps as f64;

        let mut row = Row::empty();
        row.set(TIME_COLUMN, unwrapped - clock.offset);
        for axis in LOGGED_AXES {
            if let (Some(value), Some(column)) = (reading.get(axis), device.column(axis)) {
                row.set(column, value);
            }
        }
        Ok(row)
    }

    fn append(&mut self, row: &Row) -> Result<(), LogError<W::Error>> {
        self.writer.write_row(row).map_err(LogError::Writer)?;
        self.rows += 1;
        Ok(())
    }
}

impl<W: RowWriter> SampleSink for LogSink<W> {
    type Error = LogError<W::Error>;

    fn sync(&mut self, device: DeviceId, reading: &Reading) -> Result<(), Self::Error> {
        let time = reading.get(Field::Time).ok_or(LogError::MissingTime(device))?;
        self.sync_time(device, time)
    }

    fn log(&mut self, device: DeviceId, reading: &Reading) -> Result<(), Self::Error> {
        LogSink::log(self, device, reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    /// Writer that keeps everything in memory
    #[derive(Default)]
    struct MemoryWriter {
        header: Vec<&'static str, 8>,
        rows: Vec<Row, 16>,
        finished: bool,
    }

    impl RowWriter for MemoryWriter {
        type Error = ();

        fn write_header(&mut self, columns: &[&str]) -> Result<(), ()> {
            for (name, expected) in columns.iter().zip(COLUMNS) {
                assert_eq!(*name, expected);
                self.header.push(expected).map_err(|_| ())?;
            }
            Ok(())
        }

        fn write_row(&mut self, row: &Row) -> Result<(), ()> {
            self.rows.push(*row).map_err(|_| ())
        }

        fn finish(&mut self) -> Result<(), ()> {
            self.finished = true;
            Ok(())
        }
    }

    fn dev(index: u8) -> DeviceId {
        DeviceId::new(index).unwrap()
    }

    fn sample(time: f64, ax: f64, ay: f64, az: f64) -> Reading {
        Reading::new()
            .with(Field::Time, time)
            .with(Field::AccelX, ax)
            .with(Field::AccelY, ay)
            .with(Field::AccelZ, az)
    }

    #[test]
    fn test_start_writes_header_once() {
        let mut sink = LogSink::new(MemoryWriter::default());
        sink.start().unwrap();
        assert_eq!(sink.start(), Err(LogError::AlreadyStarted));
        assert_eq!(sink.writer().header.as_slice(), &COLUMNS);
    }

    #[test]
    fn test_sync_then_log_subtracts_offset() {
        let mut sink = LogSink::new(MemoryWriter::default());
        sink.start().unwrap();
        sink.sync_time(dev(0), 100.0).unwrap();

        sink.log(dev(0), &sample(100.5, 0.1, 0.2, 0.3)).unwrap();
        sink.log(dev(0), &sample(101.0, 0.4, 0.5, 0.6)).unwrap();

        let writer = sink.end().unwrap();
        assert!(writer.finished);
        assert_eq!(writer.rows.len(), 2);

        let first = writer.rows[0];
        assert_eq!(first.time(), Some(0.5));
        assert_eq!(first.get(1), Some(0.1));
        assert_eq!(first.get(3), Some(0.3));
        for column in 4..8 {
            assert_eq!(first.get(column), None);
        }
        assert_eq!(writer.rows[1].time(), Some(1.0));
    }

    #[test]
    fn test_two_devices_share_a_timeline() {
        let mut sink = LogSink::new(MemoryWriter::default());
        sink.start().unwrap();

        // Device clocks started at very different times
        sink.sync_time(dev(0), 10.0).unwrap();
        sink.sync_time(dev(1), 500.0).unwrap();
        sink.log(dev(0), &sample(10.008, 1.0, 0.0, 0.0)).unwrap();
        sink.log(dev(1), &sample(500.008, 0.0, 1.0, 0.0)).unwrap();

        let writer = sink.end().unwrap();
        let (r0, r1) = (writer.rows[0], writer.rows[1]);

        assert!((r0.time().unwrap() - 0.008).abs() < 1e-9);
        assert!((r1.time().unwrap() - 0.008).abs() < 1e-9);
        assert_eq!(r0.get(1), Some(1.0));
        assert_eq!(r0.get(4), None);
        assert_eq!(r1.get(1), None);
        assert_eq!(r1.get(5), Some(1.0));
    }

    #[test]
    fn test_usage_errors() {
        let mut sink = LogSink::new(MemoryWriter::default());
        assert_eq!(sink.sync_time(dev(0), 0.0), Err(LogError::NotStarted));

        sink.start().unwrap();
        assert_eq!(
            sink.log(dev(1), &sample(1.0, 0.0, 0.0, 0.0)),
            Err(LogError::NotSynced(dev(1)))
        );

        sink.sync_time(dev(1), 1.0).unwrap();
        assert_eq!(
            sink.sync_time(dev(1), 2.0),
            Err(LogError::AlreadySynced(dev(1)))
        );
        assert_eq!(
            sink.log(dev(1), &Reading::new().with(Field::AccelX, 1.0)),
            Err(LogError::MissingTime(dev(1)))
        );
        assert_eq!(sink.rows_written(), 0);
    }

    #[test]
    fn test_partial_reading_leaves_cells_empty() {
        let mut sink = LogSink::new(MemoryWriter::default());
        sink.start().unwrap();
        sink.sync_time(dev(0), 0.0).unwrap();
        sink.log(dev(0), &Reading::new().with(Field::Time, 2.0).with(Field::AccelY, 0.5))
            .unwrap();

        let row = sink.writer().rows[0];
        assert_eq!(row.time(), Some(2.0));
        assert_eq!(row.get(1), None);
        assert_eq!(row.get(2), Some(0.5));
    }

    #[test]
    fn test_valve_snapshot() {
        let mut sink = LogSink::new(MemoryWriter::default());
        sink.start().unwrap();
        sink.sync_time(dev(0), 0.0).unwrap();
        sink.log_with_valve(dev(0), &sample(0.0, 0.0, 0.0, 1.0), 909)
            .unwrap();
        assert_eq!(sink.writer().rows[0].valve(), Some(909.0));
    }

    #[test]
    fn test_time_wrap() {
        let mut sink = LogSink::new(MemoryWriter::default()).with_time_wrap(100.0);
        sink.start().unwrap();
        sink.sync_time(dev(0), 90.0).unwrap();
        sink.log(dev(0), &sample(95.0, 0.0, 0.0, 0.0)).unwrap();
        sink.log(dev(0), &sample(5.0, 0.0, 0.0, 0.0)).unwrap();

        let rows = &sink.writer().rows;
        assert_eq!(rows[0].time(), Some(5.0));
        assert_eq!(rows[1].time(), Some(15.0));
    }

    #[test]
    fn test_sample_sink_sync_uses_time_field() {
        let mut sink = LogSink::new(MemoryWriter::default());
        sink.start().unwrap();
        SampleSink::sync(&mut sink, dev(0), &sample(3.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(sink.offset(dev(0)), Some(3.0));
    }

    #[test]
    fn test_end_before_start() {
        let sink = LogSink::new(MemoryWriter::default());
        assert!(matches!(sink.end(), Err(LogError::NotStarted)));
    }
}
