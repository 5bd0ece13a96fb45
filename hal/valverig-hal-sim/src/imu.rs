//! BMI160 register model
//!
//! Models just enough of the BMI160 for the rig: chip id, the clear-on-read
//! error register, the status flags, command handling for power modes and
//! fast offset compensation, and a data block that refreshes at 100 Hz of
//! sensor time. Data-ready is raised after a configurable number of status
//! polls so acquisition loops genuinely have to wait.

use std::f64::consts::TAU;

use thiserror::Error;
use valverig_hal::{I2cBus, SpiBus};

const REG_CHIP_ID: u8 = 0x00;
const REG_ERR: u8 = 0x02;
const REG_DATA_ACC_X: u8 = 0x12;
const REG_SENSORTIME: u8 = 0x18;
const REG_STATUS: u8 = 0x1B;
const REG_ACC_RANGE: u8 = 0x41;
const REG_CMD: u8 = 0x7E;

const CMD_ACC_NORMAL: u8 = 0x11;
const CMD_START_FOC: u8 = 0x03;

const STATUS_DRDY_ACC: u8 = 0x80;
const STATUS_FOC_RDY: u8 = 0x08;

/// Sensor time ticks per sample at 100 Hz (39.0625 µs per tick)
const TICKS_PER_SAMPLE: u32 = 256;

/// Errors from the simulated bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimBusError {
    /// No device answered at this I2C address
    #[error("no ACK from I2C address 0x{0:02X}")]
    Nack(u8),
    /// Read and write buffers differ in length
    #[error("transfer buffers differ in length")]
    LengthMismatch,
}

/// Simulated BMI160
#[derive(Debug, Clone)]
pub struct SimBmi160 {
    regs: [u8; 256],
    i2c_address: u8,
    acc_normal: bool,
    polls_per_sample: u32,
    polls_since_sample: u32,
    data_ready: bool,
    stalled: bool,
    samples: u32,
    sensor_time: u32,
    foc_polls: u32,
    foc_remaining: Option<u32>,
    foc_ready: bool,
    writes: Vec<(u8, u8)>,
}

impl Default for SimBmi160 {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBmi160 {
    /// Healthy device in its power-on state
    pub fn new() -> Self {
        let mut regs = [0u8; 256];
        regs[REG_CHIP_ID as usize] = 0xD1;
        regs[REG_ACC_RANGE as usize] = 0x03;
        Self {
            regs,
            i2c_address: 0x69,
            acc_normal: false,
            polls_per_sample: 2,
            polls_since_sample: 0,
            data_ready: false,
            stalled: false,
            samples: 0,
            sensor_time: 0,
            foc_polls: 3,
            foc_remaining: None,
            foc_ready: false,
            writes: Vec::new(),
        }
    }

    /// Report a different chip id
    pub fn with_chip_id(mut self, id: u8) -> Self {
        self.regs[REG_CHIP_ID as usize] = id;
        self
    }

    /// Start the free-running sensor clock at `ticks`
    pub fn with_start_time(mut self, ticks: u32) -> Self {
        self.sensor_time = ticks & 0xFF_FFFF;
        self
    }

    /// Status polls needed before each new sample is ready (minimum 1)
    pub fn with_polls_per_sample(mut self, polls: u32) -> Self {
        self.polls_per_sample = polls.max(1);
        self
    }

    /// Status polls before offset compensation reports done
    pub fn with_foc_polls(mut self, polls: u32) -> Self {
        self.foc_polls = polls;
        self
    }

    /// Answer on a different I2C address
    pub fn with_i2c_address(mut self, address: u8) -> Self {
        self.i2c_address = address;
        self
    }

    /// Latch an error code; cleared by the next ERR read
    pub fn inject_error(&mut self, err: u8) {
        self.regs[REG_ERR as usize] = err;
    }

    /// Stop (or resume) producing samples
    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Every register write so far, in order
    pub fn writes(&self) -> &[(u8, u8)] {
        &self.writes
    }

    /// Raw register contents without side effects
    pub fn register(&self, addr: u8) -> u8 {
        self.regs[addr as usize]
    }

    /// Samples produced so far
    pub fn samples_generated(&self) -> u32 {
        self.samples
    }

    /// Whether the accelerometer has been put in normal mode
    pub fn is_measuring(&self) -> bool {
        self.acc_normal
    }

    fn accel_range_g(&self) -> f64 {
        match self.regs[REG_ACC_RANGE as usize] {
            0x05 => 4.0,
            0x08 => 8.0,
            0x0C => 16.0,
            _ => 2.0,
        }
    }

    fn generate_sample(&mut self) {
        self.samples += 1;
        self.sensor_time = (self.sensor_time + TICKS_PER_SAMPLE) & 0xFF_FFFF;

        let phase = self.samples as f64 / 100.0 * TAU;
        let lsb_per_g = 32768.0 / self.accel_range_g();
        let accel = [0.05 * phase.sin(), 0.02 * phase.cos(), 1.0];

        for (axis, g) in accel.iter().enumerate() {
            let raw = (g * lsb_per_g).round().clamp(-32768.0, 32767.0) as i16;
            let at = REG_DATA_ACC_X as usize + axis * 2;
            self.regs[at..at + 2].copy_from_slice(&raw.to_le_bytes());
        }
        let time = self.sensor_time.to_le_bytes();
        let at = REG_SENSORTIME as usize;
        self.regs[at..at + 3].copy_from_slice(&time[..3]);
        self.data_ready = true;
    }

    fn status(&mut self) -> u8 {
        if self.acc_normal && !self.stalled && !self.data_ready {
            self.polls_since_sample += 1;
            if self.polls_since_sample >= self.polls_per_sample {
                self.polls_since_sample = 0;
                self.generate_sample();
            }
        }

        if let Some(remaining) = self.foc_remaining {
            if remaining == 0 {
                self.foc_remaining = None;
                self.foc_ready = true;
            } else {
                self.foc_remaining = Some(remaining - 1);
            }
        }

        let mut status = 0;
        if self.data_ready {
            status |= STATUS_DRDY_ACC;
        }
        if self.foc_ready {
            status |= STATUS_FOC_RDY;
        }
        status
    }

    fn read_register(&mut self, addr: u8) -> u8 {
        match addr {
            REG_ERR => std::mem::take(&mut self.regs[REG_ERR as usize]),
            REG_STATUS => self.status(),
            REG_DATA_ACC_X => {
                self.data_ready = false;
                self.regs[addr as usize]
            }
            _ => self.regs[addr as usize],
        }
    }

    fn read_burst(&mut self, start: u8, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.read_register(start.wrapping_add(i as u8));
        }
    }

    fn write_register(&mut self, addr: u8, value: u8) {
        self.writes.push((addr, value));
        match addr {
            REG_CMD => match value {
                CMD_ACC_NORMAL => {
                    self.acc_normal = true;
                    log::trace!("bmi160: accelerometer normal mode");
                }
                CMD_START_FOC => {
                    self.foc_ready = false;
                    self.foc_remaining = Some(self.foc_polls);
                    log::trace!("bmi160: offset compensation started");
                }
                _ => {}
            },
            REG_CHIP_ID | REG_STATUS => {}
            _ => self.regs[addr as usize] = value,
        }
    }

    fn write_burst(&mut self, start: u8, data: &[u8]) {
        for (i, value) in data.iter().enumerate() {
            self.write_register(start.wrapping_add(i as u8), *value);
        }
    }
}

impl SpiBus for SimBmi160 {
    type Error = SimBusError;

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        if read.len() != write.len() {
            return Err(SimBusError::LengthMismatch);
        }
        let Some((&first, payload)) = write.split_first() else {
            return Ok(());
        };

        read[0] = 0;
        if first & 0x80 != 0 {
            self.read_burst(first & 0x7F, &mut read[1..]);
        } else {
            read[1..].fill(0);
            self.write_burst(first, payload);
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let mut discard = vec![0u8; data.len()];
        self.transfer(&mut discard, data)
    }

    fn transfer_in_place(&mut self, data: &mut [u8]) -> Result<(), Self::Error> {
        let write = data.to_vec();
        self.transfer(data, &write)
    }
}

impl I2cBus for SimBmi160 {
    type Error = SimBusError;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        if address != self.i2c_address {
            return Err(SimBusError::Nack(address));
        }
        if let Some((&reg, payload)) = data.split_first() {
            self.write_burst(reg, payload);
        }
        Ok(())
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        if address != self.i2c_address {
            return Err(SimBusError::Nack(address));
        }
        let reg = write_data.first().copied().unwrap_or(0);
        self.read_burst(reg, read_buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spi_read(sim: &mut SimBmi160, reg: u8, len: usize) -> Vec<u8> {
        let mut tx = vec![0u8; len + 1];
        tx[0] = reg | 0x80;
        let mut rx = vec![0u8; len + 1];
        SpiBus::transfer(sim, &mut rx, &tx).unwrap();
        rx[1..].to_vec()
    }

    #[test]
    fn test_chip_id_over_spi() {
        let mut sim = SimBmi160::new();
        assert_eq!(spi_read(&mut sim, 0x00, 1), vec![0xD1]);
    }

    #[test]
    fn test_error_register_clears_on_read() {
        let mut sim = SimBmi160::new();
        sim.inject_error(0x02);
        assert_eq!(spi_read(&mut sim, 0x02, 1), vec![0x02]);
        assert_eq!(spi_read(&mut sim, 0x02, 1), vec![0x00]);
    }

    #[test]
    fn test_data_ready_cycle() {
        let mut sim = SimBmi160::new().with_polls_per_sample(2);
        // Suspended until the accelerometer is switched on
        assert_eq!(spi_read(&mut sim, 0x1B, 1)[0] & 0x80, 0);

        SpiBus::write(&mut sim, &[0x7E, 0x11]).unwrap();
        assert_eq!(spi_read(&mut sim, 0x1B, 1)[0] & 0x80, 0);
        assert_eq!(spi_read(&mut sim, 0x1B, 1)[0] & 0x80, 0x80);

        let data = spi_read(&mut sim, 0x12, 9);
        let z = i16::from_le_bytes([data[4], data[5]]);
        // 1 g at the power-on ±2 g range
        assert_eq!(z, 16384);
        assert_eq!(u32::from_le_bytes([data[6], data[7], data[8], 0]), 256);
        assert_eq!(spi_read(&mut sim, 0x1B, 1)[0] & 0x80, 0);
    }

    #[test]
    fn test_foc_completes_after_polls() {
        let mut sim = SimBmi160::new().with_foc_polls(1);
        SpiBus::write(&mut sim, &[0x7E, 0x03]).unwrap();
        assert_eq!(spi_read(&mut sim, 0x1B, 1)[0] & 0x08, 0);
        assert_eq!(spi_read(&mut sim, 0x1B, 1)[0] & 0x08, 0x08);
    }

    #[test]
    fn test_i2c_address_checked() {
        let mut sim = SimBmi160::new();
        let mut buf = [0u8; 1];
        assert_eq!(
            sim.write_read(0x68, &[0x00], &mut buf),
            Err(SimBusError::Nack(0x68))
        );
        sim.write_read(0x69, &[0x00], &mut buf).unwrap();
        assert_eq!(buf[0], 0xD1);
    }

    #[test]
    fn test_writes_recorded() {
        let mut sim = SimBmi160::new();
        I2cBus::write(&mut sim, 0x69, &[0x41, 0x05]).unwrap();
        assert_eq!(sim.writes(), &[(0x41, 0x05)]);
        assert_eq!(sim.register(0x41), 0x05);
    }
}
