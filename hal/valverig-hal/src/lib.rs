//! valverig Hardware Abstraction Layer
//!
//! This crate defines the capabilities the rig logic needs from the
//! outside world. Board backends (the simulated bench, a Linux SBC, ...)
//! implement them; everything above this crate is written against the
//! traits only.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (valverig-app)             │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  valverig-core / valverig-drivers       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  valverig-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ valverig-hal- │
//!             │      sim      │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Step, direction and enable lines
//! - [`spi::SpiBus`] - Full-duplex register transactions
//! - [`i2c::I2cBus`] - Register transactions on I2C-wired sensors
//! - [`console::LineSource`] - Operator command lines

#![no_std]
#![deny(unsafe_code)]

pub mod console;
pub mod gpio;
pub mod i2c;
pub mod spi;

// Re-export key traits at crate root for convenience
pub use console::{Line, LineSource, MAX_LINE_LEN};
pub use gpio::OutputPin;
pub use i2c::I2cBus;
pub use spi::SpiBus;
