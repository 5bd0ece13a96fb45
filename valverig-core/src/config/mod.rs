//! Configuration types
//!
//! Board-agnostic configuration structures, deserialised from TOML by the
//! application when the `serde` feature is enabled.

pub mod calibration;
pub mod hardware;
pub mod types;

pub use calibration::*;
pub use hardware::*;
pub use types::*;
