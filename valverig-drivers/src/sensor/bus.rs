//! Register-level bus access
//!
//! The sensor driver only needs "read N registers starting at R" and
//! "write one register". Both SPI and I2C wirings provide that.
//!
//! # SPI framing
//!
//! A read clocks out the register address with bit 7 set followed by N
//! zero bytes. The device answers with one turnaround byte, then the N
//! register values; the turnaround byte is discarded. A write is the
//! address with bit 7 clear followed by the value.

use core::fmt;

use valverig_core::registers::MAX_READ_LEN;
use valverig_hal::{I2cBus, SpiBus};

/// Address bit selecting a read on SPI
pub const SPI_READ_FLAG: u8 = 0x80;

/// Bytes in the largest SPI frame (address + burst)
const MAX_FRAME: usize = MAX_READ_LEN + 1;

/// Errors from a register transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError<E> {
    /// The underlying bus failed
    Transfer(E),
    /// Burst longer than the transport supports
    TooLong(usize),
}

impl<E: fmt::Debug> fmt::Display for BusError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::Transfer(e) => write!(f, "bus transfer failed: {:?}", e),
            BusError::TooLong(len) => {
                write!(f, "burst of {} bytes exceeds {}", len, MAX_READ_LEN)
            }
        }
    }
}

/// Register read/write capability
pub trait RegisterBus {
    /// Transport error
    type Error;

    /// Read `buf.len()` consecutive registers starting at `start`
    fn read_registers(&mut self, start: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write one register
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error>;

    /// Read one register
    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.read_registers(reg, &mut buf)?;
        Ok(buf[0])
    }
}

/// Register access over SPI
pub struct SpiRegisterBus<S> {
    spi: S,
}

impl<S> SpiRegisterBus<S> {
    /// Wrap an SPI device
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    /// The underlying SPI device
    pub fn inner(&self) -> &S {
        &self.spi
    }

    /// Mutable access to the underlying SPI device
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.spi
    }
}

impl<S: SpiBus> RegisterBus for SpiRegisterBus<S> {
    type Error = BusError<S::Error>;

    fn read_registers(&mut self, start: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        let len = buf.len();
        if len > MAX_READ_LEN {
            return Err(BusError::TooLong(len));
        }

        let mut tx = [0u8; MAX_FRAME];
        let mut rx = [0u8; MAX_FRAME];
        tx[0] = start | SPI_READ_FLAG;

        self.spi
            .transfer(&mut rx[..=len], &tx[..=len])
            .map_err(BusError::Transfer)?;
        buf.copy_from_slice(&rx[1..=len]);
        Ok(())
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.spi
            .write(&[reg & !SPI_READ_FLAG, value])
            .map_err(BusError::Transfer)
    }
}

/// Register access over I2C
pub struct I2cRegisterBus<I> {
    i2c: I,
    address: u8,
}

impl<I> I2cRegisterBus<I> {
    /// Wrap an I2C bus and the device's 7-bit address
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Device address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// The underlying I2C bus
    pub fn inner(&self) -> &I {
        &self.i2c
    }

    /// Mutable access to the underlying I2C bus
    pub fn inner_mut(&mut self) -> &mut I {
        &mut self.i2c
    }
}

impl<I: I2cBus> RegisterBus for I2cRegisterBus<I> {
    type Error = BusError<I::Error>;

    fn read_registers(&mut self, start: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        if buf.len() > MAX_READ_LEN {
            return Err(BusError::TooLong(buf.len()));
        }
        self.i2c
            .write_read(self.address, &[start], buf)
            .map_err(BusError::Transfer)
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(BusError::Transfer)
    }
}

/// Either wiring, chosen at runtime from configuration
pub enum Transport<S, I> {
    /// SPI-wired sensor
    Spi(SpiRegisterBus<S>),
    /// I2C-wired sensor
    I2c(I2cRegisterBus<I>),
}

impl<S, I, E> RegisterBus for Transport<S, I>
where
    S: SpiBus<Error = E>,
    I: I2cBus<Error = E>,
{
    type Error = BusError<E>;

    fn read_registers(&mut self, start: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        match self {
            Transport::Spi(bus) => bus.read_registers(start, buf),
            Transport::I2c(bus) => bus.read_registers(start, buf),
        }
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        match self {
            Transport::Spi(bus) => bus.write_register(reg, value),
            Transport::I2c(bus) => bus.write_register(reg, value),
        }
    }
}
