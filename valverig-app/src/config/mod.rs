//! Configuration loading
//!
//! The rig is described by a TOML file; the copy built into the binary is
//! used when none is given.

pub mod loader;

pub use loader::load;
