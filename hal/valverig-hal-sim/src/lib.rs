//! Simulated bench for the valverig HAL
//!
//! Implements the `valverig-hal` traits on the host so the full rig can run
//! without hardware:
//!
//! - [`SimBmi160`] - BMI160 register model reachable over SPI or I2C
//! - [`SimPin`] - Output line that counts edges
//! - [`SimDelay`] - Virtual-time delay that yields instead of sleeping
//!
//! The pin and sensor models are deterministic so driver tests can assert
//! on exact register traffic and step counts.

pub mod delay;
pub mod gpio;
pub mod imu;

pub use delay::SimDelay;
pub use gpio::{PinAllocator, PinConflict, SimPin};
pub use imu::{SimBmi160, SimBusError};
