//! Application errors
//!
//! The library crates return small `Copy` error enums; this wraps them
//! with the context needed for a useful diagnostic before exiting.

use std::path::PathBuf;

use embassy_executor::SpawnError;
use thiserror::Error;

use valverig_core::config::ConfigError;
use valverig_hal_sim::PinConflict;

use crate::storage::StorageError;

/// Fatal start-up and shutdown errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Config file could not be read
    #[error("cannot read {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for a rig
    #[error("cannot parse {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Config values are inconsistent
    #[error("invalid configuration: {0}")]
    Config(ConfigError),

    /// Two functions assigned to one GPIO line
    #[error("board setup failed: {0}")]
    Board(#[from] PinConflict),

    /// Sensor bring-up failed
    #[error("sensor {device}: {message}")]
    Sensor { device: u8, message: String },

    /// Log file could not be created or written
    #[error("measurement log: {0}")]
    Storage(#[from] StorageError),

    /// Log sink misuse or write failure
    #[error("measurement log: {0}")]
    Log(String),

    /// Console reader thread could not be started
    #[error("console: {0}")]
    Console(#[source] std::io::Error),

    /// Executor ran out of task slots
    #[error("failed to spawn task: {0:?}")]
    Spawn(SpawnError),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<SpawnError> for AppError {
    fn from(e: SpawnError) -> Self {
        AppError::Spawn(e)
    }
}

impl AppError {
    /// Wrap a driver error for one sensor
    pub fn sensor(device: u8, err: impl std::fmt::Display) -> Self {
        AppError::Sensor {
            device,
            message: err.to_string(),
        }
    }
}
