//! Hardware configuration types
//!
//! Pin assignments and drive-train parameters for the valve, and bus
//! wiring for the sensors.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::calibration::FocConfig;
use crate::motion::ValveGeometry;
use crate::registers::{AccelRange, Field, FieldCatalog, GyroRange, PlanError, RegisterPlan, MAX_FIELDS};

/// Pin configuration with optional inversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// GPIO line number (BCM numbering on the rig)
    pub pin: u8,
    /// Pin is active-low (inverted)
    #[cfg_attr(feature = "serde", serde(default))]
    pub inverted: bool,
}

impl PinConfig {
    /// Create a new pin config
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
        }
    }

    /// Create an inverted (active-low) pin
    pub const fn inverted(pin: u8) -> Self {
        Self {
            pin,
            inverted: true,
        }
    }
}

/// Valve stepper hardware configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValveHwConfig {
    /// Step pulse pin
    pub step_pin: PinConfig,
    /// Direction pin; low opens unless inverted
    pub dir_pin: PinConfig,
    /// Driver enable pin; asserted while stepping
    pub enable_pin: PinConfig,
    /// Full steps per motor rotation (200 for 1.8° motors)
    pub full_steps_per_rotation: u16,
    /// Microsteps setting
    pub microsteps: u16,
    /// Gear ratio numerator (22 for 2.2:1)
    pub gear_ratio_num: u16,
    /// Gear ratio denominator
    pub gear_ratio_den: u16,
    /// Travel from closed to fully open, in degrees
    pub max_travel_deg: u16,
    /// Motor speed in RPM
    pub rpm: u16,
}

impl ValveHwConfig {
    /// Microsteps per motor revolution
    pub fn steps_per_revolution(&self) -> u32 {
        self.full_steps_per_rotation as u32 * self.microsteps as u32
    }

    /// Drive-train geometry
    pub fn geometry(&self) -> ValveGeometry {
        ValveGeometry {
            steps_per_revolution: self.steps_per_revolution(),
            gear_ratio_num: self.gear_ratio_num as u32,
            gear_ratio_den: self.gear_ratio_den as u32,
            max_travel_deg: self.max_travel_deg as u32,
        }
    }
}

impl Default for ValveHwConfig {
    fn default() -> Self {
        Self {
            step_pin: PinConfig::new(15),
            dir_pin: PinConfig::new(22),
            enable_pin: PinConfig::inverted(17),
            full_steps_per_rotation: 200,
            microsteps: 16,
            gear_ratio_num: 22,
            gear_ratio_den: 10,
            max_travel_deg: 93,
            rpm: 100,
        }
    }
}

/// How a sensor is wired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SensorBus {
    /// SPI bus and chip select line
    Spi { bus: u8, chip_select: u8 },
    /// I²C bus and 7-bit address
    I2c { bus: u8, address: u8 },
}

impl SensorBus {
    /// SPI frequency used on the rig
    pub const SPI_FREQUENCY_HZ: u32 = 10_000;

    /// BMI160 address with SDO pulled high
    pub const BMI160_I2C_ADDRESS: u8 = 0x69;
}

/// Default sampled fields
pub const DEFAULT_FIELDS: [Field; 4] = [Field::Time, Field::AccelX, Field::AccelY, Field::AccelZ];

/// One inertial sensor
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorConfig {
    /// Device id; selects the log columns (0 or 1)
    pub id: u8,
    /// Wiring; SPI bus 0 with chip select equal to `id` when omitted
    pub bus: Option<SensorBus>,
    /// Accelerometer range
    pub accel_range: AccelRange,
    /// Gyroscope range (scales GYRO_* fields)
    pub gyro_range: GyroRange,
    /// Fields sampled every cycle
    pub fields: Vec<Field, MAX_FIELDS>,
    /// Offset compensation
    pub foc: FocConfig,
    /// Configuration attempts after a non-zero error register
    pub configure_retries: u8,
}

impl SensorConfig {
    /// Default SPI sensor with the given id
    pub fn spi(id: u8) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Effective bus wiring
    pub fn bus(&self) -> SensorBus {
        self.bus.unwrap_or(SensorBus::Spi {
            bus: 0,
            chip_select: self.id,
        })
    }

    /// Register catalog for the configured ranges
    pub fn catalog(&self) -> FieldCatalog {
        FieldCatalog::bmi160(self.accel_range, self.gyro_range)
    }

    /// Read plan for the configured fields
    pub fn plan(&self) -> Result<RegisterPlan, PlanError> {
        RegisterPlan::build(self.catalog(), &self.fields)
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        let mut fields = Vec::new();
        for field in DEFAULT_FIELDS {
            let _ = fields.push(field);
        }
        Self {
            id: 0,
            bus: None,
            accel_range: AccelRange::G4,
            gyro_range: GyroRange::Dps2000,
            fields,
            foc: FocConfig::default(),
            configure_retries: 3,
        }
    }
}
