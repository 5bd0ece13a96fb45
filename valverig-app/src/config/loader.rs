//! Configuration loading
//!
//! Reads a rig TOML file from disk. Falls back to the embedded defaults if
//! no file is given or the file does not exist.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use valverig_core::config::RigConfig;

use crate::error::AppError;

/// Embedded default configuration (compiled into the binary)
pub const EMBEDDED_CONFIG: &str = include_str!("../../rig.toml");

/// Name reported for the embedded configuration
const EMBEDDED_NAME: &str = "<built-in rig.toml>";

/// Parse and validate a configuration document
pub fn parse_config(text: &str, origin: &Path) -> Result<RigConfig, AppError> {
    let config: RigConfig = toml::from_str(text).map_err(|source| AppError::ConfigParse {
        path: origin.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration for this session
pub fn load(path: Option<&Path>) -> Result<RigConfig, AppError> {
    let config = match path {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => {
                info!("Loading configuration from {}", path.display());
                parse_config(&text, path)?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("{} not found, using built-in defaults", path.display());
                load_embedded()?
            }
            Err(source) => {
                return Err(AppError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        },
        None => {
            info!("No configuration file given, using built-in defaults");
            load_embedded()?
        }
    };

    log_config_summary(&config);
    Ok(config)
}

fn load_embedded() -> Result<RigConfig, AppError> {
    parse_config(EMBEDDED_CONFIG, &PathBuf::from(EMBEDDED_NAME))
}

fn log_config_summary(config: &RigConfig) {
    let valve = &config.valve;
    info!(
        "Valve: {} steps/rev, gear {}/{}, {}° travel, max position {}, {} rpm",
        valve.steps_per_revolution(),
        valve.gear_ratio_num,
        valve.gear_ratio_den,
        valve.max_travel_deg,
        valve.geometry().max_position(),
        valve.rpm
    );
    for sensor in &config.sensors {
        info!(
            "Sensor {}: {:?}, ±{} g, fields {:?}",
            sensor.id,
            sensor.bus(),
            sensor.accel_range.full_scale_g(),
            sensor.fields
        );
    }
    debug!(
        "Acquisition: interval {} µs, ready poll {} µs, timeout {:?} ms",
        config.acquisition.sample_interval_us,
        config.acquisition.ready_poll_us,
        config.acquisition.ready_timeout_ms
    );
}
