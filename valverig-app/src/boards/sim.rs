//! Simulated bench
//!
//! Recording pins for the valve driver and a BMI160 register model per
//! configured sensor, wired over SPI or I2C as the configuration says.

use log::debug;

use valverig_core::config::{ConfigError, PinConfig, RigConfig, SensorBus, SensorConfig};
use valverig_core::datalog::DeviceId;
use valverig_drivers::sensor::{Bmi160, I2cRegisterBus, SpiRegisterBus, Transport};
use valverig_drivers::stepper::ValveActuator;
use valverig_hal_sim::{PinAllocator, SimBmi160, SimPin};

use crate::error::AppError;

/// Register transport for one sensor
pub type SensorTransport = Transport<SimBmi160, SimBmi160>;

/// One sensor driver
pub type Sensor = Bmi160<SensorTransport>;

/// Valve step/dir/enable driver
pub type Valve = ValveActuator<SimPin, SimPin, SimPin>;

/// Sensor clocks start this far apart (24-bit ticks) so the log shows
/// the offsets being aligned
const CLOCK_SKEW_TICKS: u32 = 0x40_0000;

/// Sensors and valve of the simulated bench
pub struct SimBoard {
    /// Valve actuator
    pub valve: Valve,
    /// Configured sensors with their drivers
    pub sensors: Vec<(SensorConfig, Sensor)>,
}

impl SimBoard {
    /// Build the bench for `config`
    ///
    /// Fails if two valve lines share a GPIO or a sensor's id or field
    /// selection is unusable.
    pub fn new(config: &RigConfig) -> Result<Self, AppError> {
        let mut pins = PinAllocator::new();
        let valve_config = &config.valve;
        let step = claim(&mut pins, "step", valve_config.step_pin)?;
        let dir = claim(&mut pins, "dir", valve_config.dir_pin)?;
        let enable = claim(&mut pins, "enable", valve_config.enable_pin)?;
        let valve = ValveActuator::new(step, dir, enable, valve_config);

        let mut sensors = Vec::with_capacity(config.sensors.len());
        for sensor in &config.sensors {
            let id = DeviceId::new(sensor.id).ok_or(ConfigError::SensorIdOutOfRange(sensor.id))?;
            let plan = sensor
                .plan()
                .map_err(|e| ConfigError::Plan(sensor.id, e))?;
            let model = SimBmi160::new().with_start_time(CLOCK_SKEW_TICKS * u32::from(sensor.id));

            let transport = match sensor.bus() {
                SensorBus::Spi { bus, chip_select } => {
                    debug!("Sensor {} on simulated spidev{}.{}", id, bus, chip_select);
                    Transport::Spi(SpiRegisterBus::new(model))
                }
                SensorBus::I2c { bus, address } => {
                    debug!("Sensor {} on simulated i2c-{} at 0x{:02X}", id, bus, address);
                    Transport::I2c(I2cRegisterBus::new(model.with_i2c_address(address), address))
                }
            };

            let driver = Bmi160::new(transport, id, plan, sensor.accel_range);
            sensors.push((sensor.clone(), driver));
        }

        Ok(Self { valve, sensors })
    }
}

fn claim(pins: &mut PinAllocator, name: &'static str, pin: PinConfig) -> Result<SimPin, AppError> {
    pins.allocate(pin.pin)?;
    debug!(
        "GPIO{} assigned to {}{}",
        pin.pin,
        name,
        if pin.inverted { " (inverted)" } else { "" }
    );
    Ok(SimPin::new(name, pin.pin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use valverig_hal_sim::PinConflict;

    #[test]
    fn test_default_bench() {
        let board = SimBoard::new(&RigConfig::default()).unwrap();
        assert_eq!(board.sensors.len(), 2);
        assert_eq!(board.sensors[1].1.id().index(), 1);
        assert!(!board.valve.is_enabled());
    }

    #[test]
    fn test_shared_gpio_rejected() {
        let mut config = RigConfig::default();
        config.valve.dir_pin = config.valve.step_pin;
        assert!(matches!(
            SimBoard::new(&config),
            Err(AppError::Board(PinConflict(15)))
        ));
    }

    #[test]
    fn test_i2c_sensor_probes() {
        let mut config = RigConfig::default();
        config.sensors[0].bus = Some(SensorBus::I2c {
            bus: 1,
            address: SensorBus::BMI160_I2C_ADDRESS,
        });
        let mut board = SimBoard::new(&config).unwrap();
        for (_, sensor) in board.sensors.iter_mut() {
            sensor.probe().unwrap();
        }
    }
}
