//! CSV row writer

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use thiserror::Error;

use valverig_core::datalog::Row;
use valverig_core::traits::RowWriter;

/// Log file errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// File system error
    #[error("{0}")]
    Io(#[from] io::Error),
    /// CSV encoding or write error
    #[error("{0}")]
    Csv(#[from] ::csv::Error),
}

/// Session log file name for a start time
pub fn log_file_name<Tz: TimeZone>(started: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "measurement_log_{}.csv",
        started.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Writes log rows as CSV records
///
/// Empty cells are written as empty fields so every record has the full
/// column count.
pub struct CsvRowWriter<W: Write = File> {
    writer: ::csv::Writer<W>,
}

impl CsvRowWriter<File> {
    /// Create a new session file in `directory`
    ///
    /// The directory is created if missing. An existing file with the same
    /// name is never overwritten.
    pub fn create<Tz: TimeZone>(
        directory: &Path,
        started: &DateTime<Tz>,
    ) -> Result<(Self, PathBuf), StorageError>
    where
        Tz::Offset: std::fmt::Display,
    {
        fs::create_dir_all(directory)?;
        let path = directory.join(log_file_name(started));
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        Ok((Self::from_writer(file), path))
    }
}

impl<W: Write> CsvRowWriter<W> {
    /// Write CSV to any byte sink
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: ::csv::Writer::from_writer(inner),
        }
    }

    /// Flush and return the byte sink
    pub fn into_inner(self) -> Result<W, StorageError> {
        self.writer
            .into_inner()
            .map_err(|e| StorageError::Io(e.into_error()))
    }
}

impl<W: Write> RowWriter for CsvRowWriter<W> {
    type Error = StorageError;

    fn write_header(&mut self, columns: &[&str]) -> Result<(), Self::Error> {
        self.writer.write_record(columns)?;
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> Result<(), Self::Error> {
        self.writer.write_record(
            row.cells()
                .iter()
                .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()),
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, Utc};
    use valverig_core::datalog::{DeviceId, LogSink, COLUMNS};
    use valverig_core::registers::{Field, Reading};

    #[test]
    fn test_file_name_uses_start_time() {
        let started = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(
            log_file_name(&started),
            "measurement_log_2024-03-07_09-05-02.csv"
        );
    }

    #[test]
    fn test_empty_cells_written_as_empty_fields() {
        let mut writer = CsvRowWriter::from_writer(Vec::new());
        writer.write_header(&COLUMNS).unwrap();

        let mut row = Row::empty();
        row.set(0, 0.5);
        row.set(1, -0.25);
        writer.write_row(&row).unwrap();

        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("time,A_X_0,A_Y_0,A_Z_0,A_X_1,A_Y_1,A_Z_1,VALVE")
        );
        assert_eq!(lines.next(), Some("0.5,-0.25,,,,,,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_session_file_through_log_sink() {
        let dir = tempfile::tempdir().unwrap();
        let started = Local::now();
        let (writer, path) = CsvRowWriter::create(&dir.path().join("logs"), &started).unwrap();

        let device = DeviceId::new(1).unwrap();
        let mut sink = LogSink::new(writer);
        sink.start().unwrap();
        sink.sync_time(device, 10.0).unwrap();
        let reading = Reading::new()
            .with(Field::Time, 10.5)
            .with(Field::AccelX, 1.0)
            .with(Field::AccelY, 0.0)
            .with(Field::AccelZ, -1.0);
        sink.log(device, &reading).unwrap();
        drop(sink.end().unwrap());

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time,A_X_0,A_Y_0,A_Z_0,A_X_1,A_Y_1,A_Z_1,VALVE");
        assert_eq!(lines[1], "0.5,,,,1,0,-1,");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_existing_file_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let started = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        let (_first, _) = CsvRowWriter::create(dir.path(), &started).unwrap();
        assert!(matches!(
            CsvRowWriter::create(dir.path(), &started),
            Err(StorageError::Io(_))
        ));
    }
}
