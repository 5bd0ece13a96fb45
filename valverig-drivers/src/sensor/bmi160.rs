//! Bosch BMI160 inertial measurement unit
//!
//! Only the accelerometer is used; gyroscope and magnetometer interface
//! are put in suspend. Sampling reads the fields chosen at construction
//! through a precomputed [`RegisterPlan`], one burst per plan read.
//!
//! # Bring-up
//!
//! 1. [`Bmi160::probe`]: dummy read of 0x7F (switches the interface to
//!    SPI after power-up), then chip id must read 0xD1
//! 2. [`Bmi160::configure`]: power modes, range and output data rate
//! 3. [`Bmi160::fast_offset_compensation`]: optional; device must be
//!    held still in the orientation the FOC targets describe

use core::fmt;

use embedded_hal_async::delay::DelayNs;
use valverig_core::config::FocConfig;
use valverig_core::datalog::DeviceId;
use valverig_core::registers::{AccelRange, PlanError, Reading, RegisterPlan, MAX_READ_LEN};

use super::bus::RegisterBus;

/// BMI160 register addresses
pub mod reg {
    /// Chip identification
    pub const CHIP_ID: u8 = 0x00;
    /// Error flags (clear on read)
    pub const ERR_REG: u8 = 0x02;
    /// Data-ready and FOC status flags
    pub const STATUS: u8 = 0x1B;
    /// Accelerometer output data rate and filter
    pub const ACC_CONF: u8 = 0x40;
    /// Accelerometer range
    pub const ACC_RANGE: u8 = 0x41;
    /// Fast offset compensation targets
    pub const FOC_CONF: u8 = 0x69;
    /// Offset compensation enable
    pub const OFFSET: u8 = 0x77;
    /// Command register
    pub const CMD: u8 = 0x7E;
    /// Read to switch the interface to SPI
    pub const SPI_WAKE: u8 = 0x7F;
}

/// Command register values
pub mod cmd {
    /// Accelerometer normal power mode
    pub const ACC_NORMAL: u8 = 0x11;
    /// Gyroscope suspend
    pub const GYR_SUSPEND: u8 = 0x14;
    /// Magnetometer interface suspend
    pub const MAG_SUSPEND: u8 = 0x18;
    /// Start fast offset compensation
    pub const START_FOC: u8 = 0x03;
}

/// Expected chip id
pub const CHIP_ID: u8 = 0xD1;

/// STATUS: new accelerometer sample available
pub const STATUS_DRDY_ACC: u8 = 0x80;

/// STATUS: fast offset compensation finished
pub const STATUS_FOC_RDY: u8 = 0x08;

/// ACC_CONF: 100 Hz, normal filter, no undersampling
pub const ACC_CONF_100HZ_NORMAL: u8 = 0x28;

/// OFFSET: apply accelerometer offsets (acc_off_en)
pub const OFFSET_ACC_EN: u8 = 0x40;

/// Wait after a power-mode command before the next access
const COMMAND_DELAY_MS: u32 = 4;

/// Decoded ERR_REG contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorStatus(pub u8);

impl ErrorStatus {
    /// No error flag set
    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Chip not operable
    pub fn fatal(self) -> bool {
        self.0 & 0x01 != 0
    }

    /// Error code field (bits 4:1)
    pub fn code(self) -> u8 {
        (self.0 >> 1) & 0x0F
    }

    /// A command was dropped
    pub fn dropped_command(self) -> bool {
        self.0 & 0x40 != 0
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERR_REG={:#010b}", self.0)?;
        if self.fatal() {
            write!(f, " fatal")?;
        }
        if self.code() != 0 {
            write!(f, " code={}", self.code())?;
        }
        if self.dropped_command() {
            write!(f, " dropped-command")?;
        }
        Ok(())
    }
}

/// Sensor driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError<E> {
    /// Transport failure
    Bus(E),
    /// Chip id did not match; wrong device or not connected
    IdentityMismatch { found: u8 },
    /// ERR_REG reported a problem
    Device(ErrorStatus),
    /// Offset compensation never reported done
    FocTimeout,
    /// Returned bytes could not be decoded
    Decode(PlanError),
}

impl<E: fmt::Display> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Bus(e) => write!(f, "{}", e),
            SensorError::IdentityMismatch { found } => write!(
                f,
                "chip id 0x{:02X}, expected 0x{:02X} (not connected?)",
                found, CHIP_ID
            ),
            SensorError::Device(status) => write!(f, "device error {}", status),
            SensorError::FocTimeout => write!(f, "offset compensation timed out"),
            SensorError::Decode(e) => write!(f, "decode failed: {}", e),
        }
    }
}

/// BMI160 driver
pub struct Bmi160<B> {
    bus: B,
    id: DeviceId,
    plan: RegisterPlan,
    range: AccelRange,
    last: Option<Reading>,
}

impl<B: RegisterBus> Bmi160<B> {
    /// Create a driver; no bus traffic until [`Bmi160::probe`]
    pub fn new(bus: B, id: DeviceId, plan: RegisterPlan, range: AccelRange) -> Self {
        Self {
            bus,
            id,
            plan,
            range,
            last: None,
        }
    }

    /// Device identifier used for logging
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Read plan in use
    pub fn plan(&self) -> &RegisterPlan {
        &self.plan
    }

    /// Most recent reading
    pub fn last_read(&self) -> Option<&Reading> {
        self.last.as_ref()
    }

    /// The transport
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Give the transport back
    pub fn release(self) -> B {
        self.bus
    }

    /// Wake the interface and verify the chip id
    pub fn probe(&mut self) -> Result<(), SensorError<B::Error>> {
        self.bus
            .read_register(reg::SPI_WAKE)
            .map_err(SensorError::Bus)?;
        let found = self
            .bus
            .read_register(reg::CHIP_ID)
            .map_err(SensorError::Bus)?;
        if found != CHIP_ID {
            return Err(SensorError::IdentityMismatch { found });
        }
        Ok(())
    }

    /// Read (and thereby clear) the error register
    pub fn error_status(&mut self) -> Result<ErrorStatus, SensorError<B::Error>> {
        self.bus
            .read_register(reg::ERR_REG)
            .map(ErrorStatus)
            .map_err(SensorError::Bus)
    }

    /// Fail if the error register is non-zero
    pub fn check_errors(&mut self) -> Result<(), SensorError<B::Error>> {
        let status = self.error_status()?;
        if status.is_ok() {
            Ok(())
        } else {
            Err(SensorError::Device(status))
        }
    }

    /// Put the accelerometer in normal mode at 100 Hz
    ///
    /// Gyroscope and magnetometer interface are suspended. Fails with
    /// [`SensorError::Device`] if the chip flags an error afterwards; the
    /// caller may retry.
    pub async fn configure<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), SensorError<B::Error>> {
        for command in [cmd::ACC_NORMAL, cmd::GYR_SUSPEND, cmd::MAG_SUSPEND] {
            self.write(reg::CMD, command)?;
            delay.delay_ms(COMMAND_DELAY_MS).await;
        }
        self.write(reg::ACC_RANGE, self.range.register_code())?;
        self.write(reg::ACC_CONF, ACC_CONF_100HZ_NORMAL)?;
        self.check_errors()
    }

    /// Run fast offset compensation
    ///
    /// Returns the number of status polls it took. The accelerometer is
    /// put back in normal mode afterwards.
    pub async fn fast_offset_compensation<D: DelayNs>(
        &mut self,
        foc: &FocConfig,
        delay: &mut D,
    ) -> Result<u32, SensorError<B::Error>> {
        self.write(reg::FOC_CONF, foc.register_value())?;
        self.write(reg::OFFSET, OFFSET_ACC_EN)?;
        self.write(reg::CMD, cmd::START_FOC)?;
        delay.delay_ms(foc.settle_ms).await;
        self.check_errors()?;

        let mut polls = 0;
        loop {
            polls += 1;
            if self.status()? & STATUS_FOC_RDY != 0 {
                break;
            }
            if polls >= foc.max_polls {
                return Err(SensorError::FocTimeout);
            }
            delay.delay_ms(foc.poll_ms).await;
        }

        self.write(reg::CMD, cmd::ACC_NORMAL)?;
        delay.delay_ms(COMMAND_DELAY_MS).await;
        Ok(polls)
    }

    /// Whether a new accelerometer sample is available; never blocks
    pub fn data_ready(&mut self) -> Result<bool, SensorError<B::Error>> {
        Ok(self.status()? & STATUS_DRDY_ACC != 0)
    }

    /// Read and decode every planned field
    ///
    /// One bus transaction per plan read. The result is also kept as
    /// [`Bmi160::last_read`].
    pub fn read(&mut self) -> Result<&Reading, SensorError<B::Error>> {
        let mut reading = Reading::new();
        let mut buf = [0u8; MAX_READ_LEN];

        for read in self.plan.reads() {
            let bytes = &mut buf[..read.len as usize];
            self.bus
                .read_registers(read.start, bytes)
                .map_err(SensorError::Bus)?;
            self.plan
                .decode(read, bytes, &mut reading)
                .map_err(SensorError::Decode)?;
        }

        Ok(self.last.insert(reading))
    }

    fn status(&mut self) -> Result<u8, SensorError<B::Error>> {
        self.bus
            .read_register(reg::STATUS)
            .map_err(SensorError::Bus)
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), SensorError<B::Error>> {
        self.bus
            .write_register(register, value)
            .map_err(SensorError::Bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::bus::{BusError, I2cRegisterBus, SpiRegisterBus};
    use embassy_futures::block_on;
    use valverig_core::registers::{Field, FieldCatalog, GyroRange};
    use valverig_hal_sim::{SimBmi160, SimBusError, SimDelay};

    fn plan(fields: &[Field]) -> RegisterPlan {
        RegisterPlan::build(FieldCatalog::bmi160(AccelRange::G4, GyroRange::Dps2000), fields)
            .unwrap()
    }

    fn sensor(sim: SimBmi160) -> Bmi160<SpiRegisterBus<SimBmi160>> {
        Bmi160::new(
            SpiRegisterBus::new(sim),
            DeviceId::new(0).unwrap(),
            plan(&[Field::Time, Field::AccelX, Field::AccelY, Field::AccelZ]),
            AccelRange::G4,
        )
    }

    #[test]
    fn test_probe_accepts_bmi160() {
        let mut imu = sensor(SimBmi160::new());
        imu.probe().unwrap();
    }

    #[test]
    fn test_probe_rejects_wrong_chip() {
        let mut imu = sensor(SimBmi160::new().with_chip_id(0x00));
        assert_eq!(
            imu.probe(),
            Err(SensorError::IdentityMismatch { found: 0x00 })
        );
    }

    #[test]
    fn test_configure_register_sequence() {
        let mut imu = sensor(SimBmi160::new());
        let mut delay = SimDelay::new();
        block_on(imu.configure(&mut delay)).unwrap();

        assert_eq!(
            imu.bus().inner().writes(),
            &[
                (reg::CMD, cmd::ACC_NORMAL),
                (reg::CMD, cmd::GYR_SUSPEND),
                (reg::CMD, cmd::MAG_SUSPEND),
                (reg::ACC_RANGE, 0x05),
                (reg::ACC_CONF, ACC_CONF_100HZ_NORMAL),
            ]
        );
        assert!(imu.bus().inner().is_measuring());
    }

    #[test]
    fn test_configure_reports_error_register() {
        let mut sim = SimBmi160::new();
        sim.inject_error(0x02);
        let mut imu = sensor(sim);
        let mut delay = SimDelay::new();

        let err = block_on(imu.configure(&mut delay)).unwrap_err();
        assert_eq!(err, SensorError::Device(ErrorStatus(0x02)));

        // Register cleared on read, so a retry succeeds
        block_on(imu.configure(&mut delay)).unwrap();
    }

    #[test]
    fn test_foc_sequence() {
        let mut imu = sensor(SimBmi160::new().with_foc_polls(2));
        let mut delay = SimDelay::new();
        let foc = FocConfig::default();

        let polls = block_on(imu.fast_offset_compensation(&foc, &mut delay)).unwrap();
        assert_eq!(polls, 3);

        let writes = imu.bus().inner().writes();
        assert_eq!(writes[0], (reg::FOC_CONF, 0b0011_1101));
        assert_eq!(writes[1], (reg::OFFSET, OFFSET_ACC_EN));
        assert_eq!(writes[2], (reg::CMD, cmd::START_FOC));
        assert_eq!(writes[3], (reg::CMD, cmd::ACC_NORMAL));
        // settle + two poll waits + command delay
        assert_eq!(
            delay.elapsed_ms(),
            (foc.settle_ms + 2 * foc.poll_ms + COMMAND_DELAY_MS) as u64
        );
    }

    #[test]
    fn test_foc_timeout() {
        let mut imu = sensor(SimBmi160::new().with_foc_polls(100));
        let mut delay = SimDelay::new();
        let foc = FocConfig {
            max_polls: 5,
            ..FocConfig::default()
        };
        assert_eq!(
            block_on(imu.fast_offset_compensation(&foc, &mut delay)),
            Err(SensorError::FocTimeout)
        );
    }

    #[test]
    fn test_read_decodes_planned_fields() {
        let mut imu = sensor(SimBmi160::new().with_polls_per_sample(1));
        let mut delay = SimDelay::new();
        block_on(imu.configure(&mut delay)).unwrap();

        assert!(imu.data_ready().unwrap());
        let reading = *imu.read().unwrap();

        assert_eq!(reading.len(), 4);
        assert_eq!(reading.get(Field::AccelZ), Some(1.0));
        assert_eq!(reading.get(Field::Time), Some(256.0 * 39e-6));
        assert_eq!(reading.get(Field::GyroX), None);
        assert_eq!(imu.last_read(), Some(&reading));
        assert_eq!(imu.bus().inner().samples_generated(), 1);
    }

    #[test]
    fn test_read_over_i2c() {
        let mut imu = Bmi160::new(
            I2cRegisterBus::new(SimBmi160::new().with_polls_per_sample(1), 0x69),
            DeviceId::new(1).unwrap(),
            plan(&[Field::Time, Field::AccelZ]),
            AccelRange::G4,
        );
        let mut delay = SimDelay::new();
        imu.probe().unwrap();
        block_on(imu.configure(&mut delay)).unwrap();
        assert!(imu.data_ready().unwrap());
        assert_eq!(imu.read().unwrap().get(Field::AccelZ), Some(1.0));
    }

    #[test]
    fn test_i2c_wrong_address() {
        let mut imu = Bmi160::new(
            I2cRegisterBus::new(SimBmi160::new(), 0x68),
            DeviceId::new(0).unwrap(),
            plan(&[Field::Time]),
            AccelRange::G4,
        );
        assert_eq!(
            imu.probe(),
            Err(SensorError::Bus(BusError::Transfer(SimBusError::Nack(0x68))))
        );
    }
}
