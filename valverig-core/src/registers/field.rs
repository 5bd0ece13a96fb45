//! Field catalog for the BMI160 data registers

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of fields in the catalog
pub const MAX_FIELDS: usize = 7;

/// Sensor time resolution in seconds per LSB
pub const SENSOR_TIME_RESOLUTION_S: f64 = 39e-6;

/// Period of the 24-bit sensor time counter in seconds (2^24 ticks)
pub const SENSOR_TIME_WRAP_S: f64 = 654.311_424;

/// Full-scale denominator for the 16-bit signed data registers
const FULL_SCALE_LSB: f64 = 32768.0;

/// A named data field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Field {
    /// 24-bit free-running sensor time
    #[cfg_attr(feature = "serde", serde(rename = "TIME"))]
    Time,
    /// Acceleration along X
    #[cfg_attr(feature = "serde", serde(rename = "A_X"))]
    AccelX,
    /// Acceleration along Y
    #[cfg_attr(feature = "serde", serde(rename = "A_Y"))]
    AccelY,
    /// Acceleration along Z
    #[cfg_attr(feature = "serde", serde(rename = "A_Z"))]
    AccelZ,
    /// Angular rate around X
    #[cfg_attr(feature = "serde", serde(rename = "GYRO_X"))]
    GyroX,
    /// Angular rate around Y
    #[cfg_attr(feature = "serde", serde(rename = "GYRO_Y"))]
    GyroY,
    /// Angular rate around Z
    #[cfg_attr(feature = "serde", serde(rename = "GYRO_Z"))]
    GyroZ,
}

impl Field {
    /// Every field in catalog order
    pub const ALL: [Field; MAX_FIELDS] = [
        Field::Time,
        Field::AccelX,
        Field::AccelY,
        Field::AccelZ,
        Field::GyroX,
        Field::GyroY,
        Field::GyroZ,
    ];

    /// Register-map name of the field
    pub const fn name(self) -> &'static str {
        match self {
            Field::Time => "TIME",
            Field::AccelX => "A_X",
            Field::AccelY => "A_Y",
            Field::AccelZ => "A_Z",
            Field::GyroX => "GYRO_X",
            Field::GyroY => "GYRO_Y",
            Field::GyroZ => "GYRO_Z",
        }
    }

    /// Look a field up by its register-map name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Dense index, usable for fixed-size per-field tables
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Where a field lives and how to turn its bytes into a value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// First register of the field
    pub offset: u8,
    /// Width in bytes (little-endian)
    pub len: u8,
    /// Two's complement when set
    pub signed: bool,
    /// Physical units per LSB
    pub scale: f64,
}

impl FieldSpec {
    /// Create a field description
    pub const fn new(offset: u8, len: u8, signed: bool, scale: f64) -> Self {
        Self {
            offset,
            len,
            signed,
            scale,
        }
    }

    /// One past the last register of the field
    pub const fn end(&self) -> u16 {
        self.offset as u16 + self.len as u16
    }

    /// Interpret little-endian bytes as the raw integer
    ///
    /// Only the first `len` bytes (at most eight) are used.
    pub fn raw(&self, bytes: &[u8]) -> i64 {
        let width = bytes.len().min(self.len as usize).min(8);
        let mut value: u64 = 0;
        for (i, byte) in bytes[..width].iter().enumerate() {
            value |= (*byte as u64) << (8 * i);
        }

        if self.signed && width > 0 && width < 8 {
            let shift = 64 - 8 * width as u32;
            ((value << shift) as i64) >> shift
        } else {
            value as i64
        }
    }

    /// Decode bytes into a value in physical units
    pub fn decode(&self, bytes: &[u8]) -> f64 {
        self.raw(bytes) as f64 * self.scale
    }
}

/// Accelerometer measurement range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AccelRange {
    /// ±2 g
    G2,
    /// ±4 g
    #[default]
    G4,
    /// ±8 g
    G8,
    /// ±16 g
    G16,
}

impl AccelRange {
    /// Full-scale value in g
    pub const fn full_scale_g(self) -> f64 {
        match self {
            AccelRange::G2 => 2.0,
            AccelRange::G4 => 4.0,
            AccelRange::G8 => 8.0,
            AccelRange::G16 => 16.0,
        }
    }

    /// ACC_RANGE register code
    pub const fn register_code(self) -> u8 {
        match self {
            AccelRange::G2 => 0x03,
            AccelRange::G4 => 0x05,
            AccelRange::G8 => 0x08,
            AccelRange::G16 => 0x0C,
        }
    }
}

/// Gyroscope measurement range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GyroRange {
    /// ±2000 °/s (power-on default)
    #[default]
    Dps2000,
    /// ±1000 °/s
    Dps1000,
    /// ±500 °/s
    Dps500,
    /// ±250 °/s
    Dps250,
    /// ±125 °/s
    Dps125,
}

impl GyroRange {
    /// Full-scale value in degrees per second
    pub const fn full_scale_dps(self) -> f64 {
        match self {
            GyroRange::Dps2000 => 2000.0,
            GyroRange::Dps1000 => 1000.0,
            GyroRange::Dps500 => 500.0,
            GyroRange::Dps250 => 250.0,
            GyroRange::Dps125 => 125.0,
        }
    }
}

/// Register layout and scaling for every catalog field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCatalog {
    specs: [FieldSpec; MAX_FIELDS],
}

impl FieldCatalog {
    /// BMI160 data register map for the given measurement ranges
    pub fn bmi160(accel: AccelRange, gyro: GyroRange) -> Self {
        let accel_scale = accel.full_scale_g() / FULL_SCALE_LSB;
        let gyro_scale = gyro.full_scale_dps() / FULL_SCALE_LSB;

        Self {
            specs: [
                FieldSpec::new(0x18, 3, false, SENSOR_TIME_RESOLUTION_S),
                FieldSpec::new(0x12, 2, true, accel_scale),
                FieldSpec::new(0x14, 2, true, accel_scale),
                FieldSpec::new(0x16, 2, true, accel_scale),
                FieldSpec::new(0x0C, 2, true, gyro_scale),
                FieldSpec::new(0x0E, 2, true, gyro_scale),
                FieldSpec::new(0x10, 2, true, gyro_scale),
            ],
        }
    }

    /// Replace the description of one field
    pub fn with_spec(mut self, field: Field, spec: FieldSpec) -> Self {
        self.specs[field.index()] = spec;
        self
    }

    /// Description of a field
    pub fn spec(&self, field: Field) -> &FieldSpec {
        &self.specs[field.index()]
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::bmi160(AccelRange::default(), GyroRange::default())
    }
}
