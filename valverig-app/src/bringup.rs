//! Sensor bring-up
//!
//! Runs before any task is spawned: identify the chip, configure it
//! (retrying while the error register complains), then run offset
//! compensation once the operator confirms the device is at rest.

use core::fmt;

use embedded_hal_async::delay::DelayNs;
use log::{info, warn};

use valverig_core::config::SensorConfig;
use valverig_drivers::sensor::{Bmi160, RegisterBus, SensorError};
use valverig_hal::LineSource;

use crate::error::AppError;

/// How bring-up ended for one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BringUp {
    /// Configuration attempts made
    pub attempts: u8,
    /// Error register still non-zero after the last attempt
    pub degraded: bool,
    /// Status polls offset compensation took, if it ran
    pub foc_polls: Option<u32>,
}

/// Identify, configure and compensate one sensor
///
/// A wrong chip id or a bus failure is fatal. A persistent error register
/// or failed offset compensation is reported and the sensor is used
/// anyway.
pub async fn bring_up<B, L, D>(
    sensor: &mut Bmi160<B>,
    config: &SensorConfig,
    console: &mut L,
    delay: &mut D,
    compensate: bool,
) -> Result<BringUp, AppError>
where
    B: RegisterBus,
    B::Error: fmt::Display,
    L: LineSource,
    L::Error: fmt::Debug,
    D: DelayNs,
{
    let id = config.id;
    sensor.probe().map_err(|e| AppError::sensor(id, e))?;
    info!("Sensor {}: BMI160 found", id);

    let mut result = BringUp {
        attempts: 0,
        degraded: false,
        foc_polls: None,
    };

    loop {
        result.attempts += 1;
        match sensor.configure(delay).await {
            Ok(()) => break,
            Err(SensorError::Device(status)) if result.attempts <= config.configure_retries => {
                warn!(
                    "Sensor {}: {} after configuration, retrying ({}/{})",
                    id, status, result.attempts, config.configure_retries
                );
            }
            Err(SensorError::Device(status)) => {
                warn!("Sensor {}: {} persists, continuing", id, status);
                result.degraded = true;
                break;
            }
            Err(e) => return Err(AppError::sensor(id, e)),
        }
    }
    info!("Sensor {}: configured", id);

    if !(compensate && config.foc.enabled) {
        return Ok(result);
    }

    println!(
        "Sensor {}: hold the device still in its resting orientation, then press Enter",
        id
    );
    match console.read_line().await {
        Ok(Some(_)) => {}
        Ok(None) => warn!("Console closed, compensating sensor {} without confirmation", id),
        Err(e) => warn!("Console read failed ({:?}), compensating sensor {} anyway", e, id),
    }

    match sensor.fast_offset_compensation(&config.foc, delay).await {
        Ok(polls) => {
            info!("Sensor {}: offset compensation done after {} polls", id, polls);
            result.foc_polls = Some(polls);
        }
        Err(SensorError::Bus(e)) => return Err(AppError::sensor(id, e)),
        Err(e) => warn!("Sensor {}: offset compensation failed: {}", id, e),
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    use embassy_futures::block_on;
    use valverig_core::datalog::DeviceId;
    use valverig_drivers::sensor::SpiRegisterBus;
    use valverig_drivers::sensor::bmi160::{cmd, reg};
    use valverig_hal::Line;
    use valverig_hal_sim::{SimBmi160, SimDelay};

    /// Console that answers every read with the same thing
    struct Scripted(Option<&'static str>, u32);

    impl LineSource for Scripted {
        type Error = Infallible;

        async fn read_line(&mut self) -> Result<Option<Line>, Self::Error> {
            self.1 += 1;
            Ok(self.0.map(|s| Line::try_from(s).unwrap()))
        }
    }

    fn sensor(sim: SimBmi160, config: &SensorConfig) -> Bmi160<SpiRegisterBus<SimBmi160>> {
        Bmi160::new(
            SpiRegisterBus::new(sim),
            DeviceId::new(config.id).unwrap(),
            config.plan().unwrap(),
            config.accel_range,
        )
    }

    fn count_writes(sensor: &Bmi160<SpiRegisterBus<SimBmi160>>, write: (u8, u8)) -> usize {
        sensor
            .bus()
            .inner()
            .writes()
            .iter()
            .filter(|w| **w == write)
            .count()
    }

    #[test]
    fn test_healthy_sensor_with_confirmation() {
        let config = SensorConfig::spi(0);
        let mut imu = sensor(SimBmi160::new(), &config);
        let mut console = Scripted(Some(""), 0);

        let result = block_on(bring_up(&mut imu, &config, &mut console, &mut SimDelay::new(), true))
            .unwrap();

        assert_eq!(result.attempts, 1);
        assert!(!result.degraded);
        assert_eq!(result.foc_polls, Some(4));
        assert_eq!(console.1, 1);
        assert_eq!(count_writes(&imu, (reg::CMD, cmd::START_FOC)), 1);
        assert!(imu.bus().inner().is_measuring());
    }

    #[test]
    fn test_wrong_chip_is_fatal() {
        let config = SensorConfig::spi(1);
        let mut imu = sensor(SimBmi160::new().with_chip_id(0x00), &config);
        let mut console = Scripted(None, 0);

        let err = block_on(bring_up(&mut imu, &config, &mut console, &mut SimDelay::new(), true))
            .unwrap_err();

        assert!(matches!(err, AppError::Sensor { device: 1, .. }));
        assert!(imu.bus().inner().writes().is_empty());
        assert_eq!(console.1, 0);
    }

    #[test]
    fn test_error_register_retried_once() {
        let config = SensorConfig::spi(0);
        let mut sim = SimBmi160::new();
        sim.inject_error(0x02);
        let mut imu = sensor(sim, &config);

        let result = block_on(bring_up(
            &mut imu,
            &config,
            &mut Scripted(None, 0),
            &mut SimDelay::new(),
            false,
        ))
        .unwrap();

        assert_eq!(result.attempts, 2);
        assert!(!result.degraded);
        assert_eq!(result.foc_polls, None);
        assert_eq!(count_writes(&imu, (reg::CMD, cmd::ACC_NORMAL)), 2);
    }

    #[test]
    fn test_compensation_skipped_when_disabled() {
        let mut config = SensorConfig::spi(0);
        config.foc.enabled = false;
        let mut imu = sensor(SimBmi160::new(), &config);
        let mut console = Scripted(Some(""), 0);

        let result = block_on(bring_up(&mut imu, &config, &mut console, &mut SimDelay::new(), true))
            .unwrap();

        assert_eq!(result.foc_polls, None);
        assert_eq!(console.1, 0);
        assert_eq!(count_writes(&imu, (reg::CMD, cmd::START_FOC)), 0);
    }
}
