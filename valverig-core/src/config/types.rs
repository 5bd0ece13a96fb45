//! Rig configuration
//!
//! Every field has a default, so an empty configuration file describes the
//! bench as built: one valve and two SPI sensors.

use core::fmt;

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::hardware::{SensorConfig, ValveHwConfig};
use crate::datalog::{DeviceId, MAX_DEVICES};
use crate::motion::StepTiming;
use crate::registers::{Field, PlanError};

/// Maximum sensors per config
pub const MAX_SENSORS: usize = MAX_DEVICES;

/// Maximum log directory path length
pub const MAX_PATH_LEN: usize = 128;

/// Sampling loop timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AcquisitionConfig {
    /// Pause after each logged sample (µs)
    pub sample_interval_us: u32,
    /// Delay between data-ready polls (µs); 0 yields to other tasks only
    pub ready_poll_us: u32,
    /// Give up on a sensor that stays not-ready this long (ms)
    pub ready_timeout_ms: Option<u32>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_interval_us: 8_000,
            ready_poll_us: 500,
            ready_timeout_ms: None,
        }
    }
}

/// Measurement log output
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LogConfig {
    /// Directory the CSV file is created in
    pub directory: String<MAX_PATH_LEN>,
    /// Fill the VALVE column with the current position on every row
    pub valve_snapshots: bool,
    /// Continue sensor time across 24-bit counter rollover
    pub unwrap_sensor_time: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        let mut directory = String::new();
        let _ = directory.push('.');
        Self {
            directory,
            valve_snapshots: false,
            unwrap_sensor_time: true,
        }
    }
}

/// Complete rig configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RigConfig {
    /// Valve actuator
    pub valve: ValveHwConfig,
    /// Inertial sensors, at most two
    pub sensors: Vec<SensorConfig, MAX_SENSORS>,
    /// Sampling loop timing
    pub acquisition: AcquisitionConfig,
    /// Log output
    pub log: LogConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        let mut sensors = Vec::new();
        let _ = sensors.push(SensorConfig::spi(0));
        let _ = sensors.push(SensorConfig::spi(1));
        Self {
            valve: ValveHwConfig::default(),
            sensors,
            acquisition: AcquisitionConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Motor speed of zero
    ZeroRpm,
    /// Zero steps per rotation or microsteps
    ZeroSteps,
    /// Zero in the gear ratio
    ZeroGearRatio,
    /// Geometry gives no travel at all
    NoTravel,
    /// No sensors configured
    NoSensors,
    /// Sensor id has no log columns
    SensorIdOutOfRange(u8),
    /// Two sensors share an id
    DuplicateSensorId(u8),
    /// Sensor does not sample TIME, which the log needs
    MissingTimeField(u8),
    /// Sensor field selection cannot be planned
    Plan(u8, PlanError),
    /// Sample interval of zero would never suspend
    ZeroSampleInterval,
    /// A data-ready timeout needs a poll interval to measure against
    TimeoutWithoutPollInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroRpm => write!(f, "valve.rpm must be greater than zero"),
            ConfigError::ZeroSteps => {
                write!(f, "valve.full_steps_per_rotation and valve.microsteps must be non-zero")
            }
            ConfigError::ZeroGearRatio => write!(f, "valve gear ratio must be non-zero"),
            ConfigError::NoTravel => write!(f, "valve geometry gives a maximum position of zero"),
            ConfigError::NoSensors => write!(f, "at least one sensor must be configured"),
            ConfigError::SensorIdOutOfRange(id) => {
                write!(f, "sensor id {} out of range (0..{})", id, MAX_SENSORS)
            }
            ConfigError::DuplicateSensorId(id) => write!(f, "sensor id {} used twice", id),
            ConfigError::MissingTimeField(id) => {
                write!(f, "sensor {} must sample the TIME field", id)
            }
            ConfigError::Plan(id, err) => write!(f, "sensor {} fields: {}", id, err),
            ConfigError::ZeroSampleInterval => {
                write!(f, "acquisition.sample_interval_us must be greater than zero")
            }
            ConfigError::TimeoutWithoutPollInterval => write!(
                f,
                "acquisition.ready_timeout_ms requires a non-zero acquisition.ready_poll_us"
            ),
        }
    }
}

impl RigConfig {
    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valve = &self.valve;
        if valve.rpm == 0 {
            return Err(ConfigError::ZeroRpm);
        }
        if valve.steps_per_revolution() == 0 {
            return Err(ConfigError::ZeroSteps);
        }
        if valve.gear_ratio_num == 0 || valve.gear_ratio_den == 0 {
            return Err(ConfigError::ZeroGearRatio);
        }
        if valve.geometry().max_position() == 0 {
            return Err(ConfigError::NoTravel);
        }
        if StepTiming::from_rpm(valve.steps_per_revolution(), valve.rpm as u32).is_none() {
            return Err(ConfigError::ZeroRpm);
        }

        if self.sensors.is_empty() {
            return Err(ConfigError::NoSensors);
        }
        for (i, sensor) in self.sensors.iter().enumerate() {
            if DeviceId::new(sensor.id).is_none() {
                return Err(ConfigError::SensorIdOutOfRange(sensor.id));
            }
            if self.sensors[..i].iter().any(|s| s.id == sensor.id) {
                return Err(ConfigError::DuplicateSensorId(sensor.id));
            }
            if !sensor.fields.contains(&Field::Time) {
                return Err(ConfigError::MissingTimeField(sensor.id));
            }
            sensor
                .plan()
                .map_err(|err| ConfigError::Plan(sensor.id, err))?;
        }

        let acquisition = &self.acquisition;
        if acquisition.sample_interval_us == 0 {
            return Err(ConfigError::ZeroSampleInterval);
        }
        if acquisition.ready_timeout_ms.is_some() && acquisition.ready_poll_us == 0 {
            return Err(ConfigError::TimeoutWithoutPollInterval);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RigConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.acquisition.sample_interval_us, 8_000);
        assert_eq!(config.log.directory.as_str(), ".");
    }

    #[test]
    fn test_rejects_zero_rpm() {
        let mut config = RigConfig::default();
        config.valve.rpm = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroRpm));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut config = RigConfig::default();
        config.sensors[1].id = 0;
        assert_eq!(config.validate(), Err(ConfigError::DuplicateSensorId(0)));
    }

    #[test]
    fn test_rejects_out_of_range_id() {
        let mut config = RigConfig::default();
        config.sensors[1].id = 2;
        assert_eq!(config.validate(), Err(ConfigError::SensorIdOutOfRange(2)));
    }

    #[test]
    fn test_requires_time_field() {
        let mut config = RigConfig::default();
        config.sensors[0].fields.retain(|f| *f != Field::Time);
        assert_eq!(config.validate(), Err(ConfigError::MissingTimeField(0)));
    }

    #[test]
    fn test_default_poll_interval_sleeps() {
        let acquisition = AcquisitionConfig::default();
        assert_eq!(acquisition.ready_poll_us, 500);

        let mut config = RigConfig::default();
        config.acquisition.ready_timeout_ms = Some(2_000);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_timeout_needs_poll_interval() {
        let mut config = RigConfig::default();
        config.acquisition.ready_timeout_ms = Some(500);
        config.acquisition.ready_poll_us = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::TimeoutWithoutPollInterval)
        );
        config.acquisition.ready_poll_us = 500;
        assert_eq!(config.validate(), Ok(()));
    }
}
