//! Sensor acquisition loop
//!
//! One loop per sensor. Each iteration checks the terminate signal, waits
//! for data-ready, reads the planned fields and hands them to the sink,
//! then sleeps for the sample interval. The very first reading also
//! fixes the device's time offset in the sink.
//!
//! While waiting for data-ready the loop either yields (no poll interval
//! configured) or sleeps for the poll interval and charges it to a
//! [`ReadyWatchdog`], which may be armed with a timeout.

use core::fmt;

use embassy_futures::yield_now;
use embedded_hal_async::delay::DelayNs;
use valverig_core::config::AcquisitionConfig;
use valverig_core::safety::{ReadyWatchdog, WatchdogStatus};
use valverig_core::scheduler::TerminateSignal;
use valverig_core::traits::SampleSink;

use super::bmi160::{Bmi160, SensorError};
use super::bus::RegisterBus;

/// Summary of a finished acquisition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcquisitionStats {
    /// Samples handed to the sink
    pub samples: u64,
    /// Data-ready polls that found nothing
    pub idle_polls: u64,
    /// Longest measured data-ready wait (µs); zero when only yielding
    pub longest_wait_us: u64,
}

/// Reasons an acquisition loop stops early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionError<B, S> {
    /// Sensor access failed
    Sensor(SensorError<B>),
    /// The sink rejected a sample
    Sink(S),
    /// Data-ready stayed low past the configured timeout
    Stalled { waited_us: u64 },
}

impl<B: fmt::Display, S: fmt::Display> fmt::Display for AcquisitionError<B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::Sensor(e) => write!(f, "sensor: {}", e),
            AcquisitionError::Sink(e) => write!(f, "log: {}", e),
            AcquisitionError::Stalled { waited_us } => {
                write!(f, "no data-ready for {} ms", waited_us / 1000)
            }
        }
    }
}

impl<B, S> From<SensorError<B>> for AcquisitionError<B, S> {
    fn from(e: SensorError<B>) -> Self {
        AcquisitionError::Sensor(e)
    }
}

/// Run the sample loop until `terminate` is raised
pub async fn acquire<B, D, S>(
    sensor: &mut Bmi160<B>,
    delay: &mut D,
    sink: &mut S,
    terminate: &TerminateSignal,
    config: &AcquisitionConfig,
) -> Result<AcquisitionStats, AcquisitionError<B::Error, S::Error>>
where
    B: RegisterBus,
    D: DelayNs,
    S: SampleSink,
{
    let device = sensor.id();
    let mut stats = AcquisitionStats::default();
    let mut watchdog = ReadyWatchdog::new(config.ready_timeout_ms);

    'sampling: while !terminate.is_raised() {
        while !sensor.data_ready()? {
            stats.idle_polls += 1;
            if terminate.is_raised() {
                break 'sampling;
            }

            if config.ready_poll_us == 0 {
                yield_now().await;
            } else {
                delay.delay_us(config.ready_poll_us).await;
                if let WatchdogStatus::Expired { waited_us } =
                    watchdog.record_wait(config.ready_poll_us)
                {
                    return Err(AcquisitionError::Stalled { waited_us });
                }
            }
        }
        watchdog.feed();

        let reading = *sensor.read()?;
        if stats.samples == 0 {
            sink.sync(device, &reading).map_err(AcquisitionError::Sink)?;
        }
        sink.log(device, &reading).map_err(AcquisitionError::Sink)?;
        stats.samples += 1;

        delay.delay_us(config.sample_interval_us).await;
    }

    stats.longest_wait_us = watchdog.longest_wait_us();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::bus::SpiRegisterBus;
    use embassy_futures::{block_on, join::join};
    use valverig_core::datalog::{DeviceId, LogSink, Row};
    use valverig_core::registers::{AccelRange, Field, FieldCatalog, GyroRange, RegisterPlan};
    use valverig_core::traits::RowWriter;
    use valverig_hal_sim::{SimBmi160, SimDelay};

    extern crate std;
    use std::vec::Vec;

    #[derive(Default)]
    struct RowBuffer {
        rows: Vec<Row>,
    }

    impl RowWriter for RowBuffer {
        type Error = ();

        fn write_header(&mut self, _columns: &[&str]) -> Result<(), ()> {
            Ok(())
        }

        fn write_row(&mut self, row: &Row) -> Result<(), ()> {
            self.rows.push(*row);
            Ok(())
        }

        fn finish(&mut self) -> Result<(), ()> {
            Ok(())
        }
    }

    /// Sink that raises terminate after a fixed number of samples
    struct StopAfter<'a, S> {
        inner: S,
        remaining: u32,
        terminate: &'a TerminateSignal,
    }

    impl<S: SampleSink> SampleSink for StopAfter<'_, S> {
        type Error = S::Error;

        fn sync(&mut self, device: DeviceId, reading: &valverig_core::registers::Reading) -> Result<(), S::Error> {
            self.inner.sync(device, reading)
        }

        fn log(&mut self, device: DeviceId, reading: &valverig_core::registers::Reading) -> Result<(), S::Error> {
            self.inner.log(device, reading)?;
            self.remaining -= 1;
            if self.remaining == 0 {
                self.terminate.raise();
            }
            Ok(())
        }
    }

    fn sensor(index: u8, sim: SimBmi160) -> Bmi160<SpiRegisterBus<SimBmi160>> {
        let plan = RegisterPlan::build(
            FieldCatalog::bmi160(AccelRange::G4, GyroRange::Dps2000),
            &[Field::Time, Field::AccelX, Field::AccelY, Field::AccelZ],
        )
        .unwrap();
        Bmi160::new(
            SpiRegisterBus::new(sim),
            DeviceId::new(index).unwrap(),
            plan,
            AccelRange::G4,
        )
    }

    fn configured(index: u8, sim: SimBmi160) -> Bmi160<SpiRegisterBus<SimBmi160>> {
        let mut imu = sensor(index, sim);
        block_on(imu.configure(&mut SimDelay::new())).unwrap();
        imu
    }

    #[test]
    fn test_exits_immediately_when_terminated() {
        let terminate = TerminateSignal::new();
        terminate.raise();
        let mut imu = configured(0, SimBmi160::new());
        let mut log = LogSink::new(RowBuffer::default());
        log.start().unwrap();

        let stats = block_on(acquire(
            &mut imu,
            &mut SimDelay::new(),
            &mut log,
            &terminate,
            &AcquisitionConfig::default(),
        ))
        .unwrap();
        assert_eq!(stats.samples, 0);
        assert_eq!(log.rows_written(), 0);
    }

    #[test]
    fn test_first_sample_syncs_then_logs() {
        let terminate = TerminateSignal::new();
        let mut imu = configured(0, SimBmi160::new().with_start_time(1000));
        let mut log = LogSink::new(RowBuffer::default());
        log.start().unwrap();
        let mut sink = StopAfter {
            inner: &mut log,
            remaining: 3,
            terminate: &terminate,
        };
        let mut delay = SimDelay::new();

        let stats = block_on(acquire(
            &mut imu,
            &mut delay,
            &mut sink,
            &terminate,
            &AcquisitionConfig::default(),
        ))
        .unwrap();

        assert_eq!(stats.samples, 3);
        // Sim needs two status polls per sample: one miss each
        assert_eq!(stats.idle_polls, 3);
        assert_eq!(delay.elapsed_ns(), 3 * (8_000_000 + 500_000));
        assert_eq!(stats.longest_wait_us, 500);

        let device = DeviceId::new(0).unwrap();
        assert_eq!(log.offset(device), Some(1256.0 * 39e-6));
        let rows = &log.writer().rows;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].time(), Some(0.0));
        let step = 256.0 * 39e-6;
        assert!((rows[2].time().unwrap() - 2.0 * step).abs() < 1e-12);
        assert_eq!(rows[1].get(3), Some(1.0));
        assert_eq!(rows[1].get(6), None);
    }

    #[test]
    fn test_stalled_sensor_times_out() {
        let terminate = TerminateSignal::new();
        let mut sim = SimBmi160::new();
        sim.set_stalled(true);
        let mut imu = configured(1, sim);
        let mut log = LogSink::new(RowBuffer::default());
        log.start().unwrap();

        let config = AcquisitionConfig {
            ready_poll_us: 1_000,
            ready_timeout_ms: Some(5),
            ..AcquisitionConfig::default()
        };
        let result = block_on(acquire(
            &mut imu,
            &mut SimDelay::new(),
            &mut log,
            &terminate,
            &config,
        ));
        assert_eq!(result, Err(AcquisitionError::Stalled { waited_us: 6_000 }));
    }

    #[test]
    fn test_stalled_sensor_still_honours_terminate() {
        let terminate = TerminateSignal::new();
        let mut sim = SimBmi160::new();
        sim.set_stalled(true);
        let mut imu = configured(0, sim);
        let mut log = LogSink::new(RowBuffer::default());
        log.start().unwrap();

        let stop = async {
            for _ in 0..10 {
                yield_now().await;
            }
            terminate.raise();
        };
        let mut delay = SimDelay::new();
        let config = AcquisitionConfig::default();
        let run = acquire(&mut imu, &mut delay, &mut log, &terminate, &config);
        let (stats, ()) = block_on(join(run, stop));
        let stats = stats.unwrap();
        assert_eq!(stats.samples, 0);
        assert!(stats.idle_polls >= 10);
        assert_eq!(log.rows_written(), 0);
    }
}
