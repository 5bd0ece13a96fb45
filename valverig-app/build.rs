//! Build script for valverig
//!
//! Validates the embedded rig.toml at compile time so a broken default
//! configuration never reaches the bench.

use std::fs;
use std::path::Path;

/// Field names the sensors can sample
const KNOWN_FIELDS: [&str; 7] = ["TIME", "A_X", "A_Y", "A_Z", "GYRO_X", "GYRO_Y", "GYRO_Z"];

fn main() {
    println!("cargo:rerun-if-changed=rig.toml");
    println!("cargo:rerun-if-changed=build.rs");

    let config_path = Path::new("rig.toml");
    if !config_path.exists() {
        fail(
            "rig.toml not found",
            &["The binary embeds rig.toml as its default configuration."],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read rig.toml", &[&e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let msg = e.to_string();
            let lines: Vec<&str> = msg.lines().collect();
            fail("Invalid TOML syntax in rig.toml", &lines)
        }
    };

    let mut errors = Vec::new();
    validate_valve(&config, &mut errors);
    validate_sensors(&config, &mut errors);

    if !errors.is_empty() {
        let lines: Vec<&str> = errors.iter().map(String::as_str).collect();
        fail("Invalid configuration in rig.toml", &lines);
    }
}

/// Report an error in a box and abort the build
fn fail(title: &str, lines: &[&str]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.to_string()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");

    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}

fn validate_valve(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(valve) = config.get("valve") else {
        return;
    };
    let Some(valve) = valve.as_table() else {
        errors.push("[valve] must be a table".to_string());
        return;
    };

    for key in [
        "rpm",
        "full_steps_per_rotation",
        "microsteps",
        "gear_ratio_num",
        "gear_ratio_den",
    ] {
        if let Some(value) = valve.get(key) {
            match value.as_integer() {
                Some(n) if n > 0 && n <= i64::from(u16::MAX) => {}
                _ => errors.push(format!("[valve] {} must be 1-65535", key)),
            }
        }
    }

    if let Some(toml::Value::Integer(deg)) = valve.get("max_travel_deg") {
        if *deg <= 0 || *deg > 360 {
            errors.push("[valve] max_travel_deg must be 1-360".to_string());
        }
    }
}

fn validate_sensors(config: &toml::Value, errors: &mut Vec<String>) {
    let sensors = match config.get("sensors") {
        Some(toml::Value::Array(sensors)) => sensors,
        Some(_) => {
            errors.push("[[sensors]] must be an array of tables".to_string());
            return;
        }
        None => return,
    };

    if sensors.is_empty() || sensors.len() > 2 {
        errors.push("between one and two [[sensors]] are supported".to_string());
    }

    let mut seen = Vec::new();
    for (i, sensor) in sensors.iter().enumerate() {
        let Some(sensor) = sensor.as_table() else {
            errors.push(format!("sensor {} must be a table", i));
            continue;
        };

        let id = match sensor.get("id") {
            Some(toml::Value::Integer(id)) if (0..2).contains(id) => *id,
            Some(_) => {
                errors.push(format!("sensor {} id must be 0 or 1", i));
                continue;
            }
            None => 0,
        };
        if seen.contains(&id) {
            errors.push(format!("sensor id {} used twice", id));
        }
        seen.push(id);

        if let Some(fields) = sensor.get("fields") {
            let Some(fields) = fields.as_array() else {
                errors.push(format!("sensor {} fields must be an array", id));
                continue;
            };
            let mut has_time = false;
            for field in fields {
                match field.as_str() {
                    Some(name) if KNOWN_FIELDS.contains(&name) => has_time |= name == "TIME",
                    _ => errors.push(format!("sensor {} has unknown field {}", id, field)),
                }
            }
            if !has_time {
                errors.push(format!("sensor {} must sample TIME", id));
            }
        }
    }
}
