//! Inertial sensor drivers

pub mod acquire;
pub mod bmi160;
pub mod bus;

pub use acquire::{acquire, AcquisitionError, AcquisitionStats};
pub use bmi160::{Bmi160, ErrorStatus, SensorError};
pub use bus::{BusError, I2cRegisterBus, RegisterBus, SpiRegisterBus, Transport};
