//! Fast offset compensation settings
//!
//! The BMI160 can measure its own accelerometer offsets while held still
//! in a known orientation. Each axis is told which acceleration it should
//! read at rest.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Expected resting acceleration for one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FocTarget {
    /// Axis excluded from compensation
    Disabled,
    /// +1 g (axis pointing up)
    PlusOneG,
    /// -1 g (axis pointing down)
    MinusOneG,
    /// 0 g (axis horizontal)
    #[default]
    ZeroG,
}

impl FocTarget {
    /// Two-bit FOC_CONF code
    pub const fn code(self) -> u8 {
        match self {
            FocTarget::Disabled => 0b00,
            FocTarget::PlusOneG => 0b01,
            FocTarget::MinusOneG => 0b10,
            FocTarget::ZeroG => 0b11,
        }
    }
}

/// Offset compensation configuration for one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FocConfig {
    /// Run compensation during bring-up
    pub enabled: bool,
    /// Resting target for X
    pub x: FocTarget,
    /// Resting target for Y
    pub y: FocTarget,
    /// Resting target for Z
    pub z: FocTarget,
    /// Wait after triggering before the first status poll (ms)
    pub settle_ms: u32,
    /// Interval between `foc_rdy` polls (ms)
    pub poll_ms: u32,
    /// Give up after this many polls
    pub max_polls: u32,
}

impl FocConfig {
    /// FOC_CONF register value (accelerometer axes only)
    pub const fn register_value(&self) -> u8 {
        (self.x.code() << 4) | (self.y.code() << 2) | self.z.code()
    }
}

impl Default for FocConfig {
    /// Device standing vertical: X and Y level, Z reading +1 g
    fn default() -> Self {
        Self {
            enabled: true,
            x: FocTarget::ZeroG,
            y: FocTarget::ZeroG,
            z: FocTarget::PlusOneG,
            settle_ms: 200,
            poll_ms: 10,
            max_polls: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_register_value() {
        assert_eq!(FocConfig::default().register_value(), 0b0011_1101);
    }

    #[test]
    fn test_register_value_per_axis() {
        let foc = FocConfig {
            x: FocTarget::MinusOneG,
            y: FocTarget::Disabled,
            z: FocTarget::ZeroG,
            ..FocConfig::default()
        };
        assert_eq!(foc.register_value(), 0b0010_0011);
    }
}
