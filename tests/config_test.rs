// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use flow_modbus_bridge::config::{Config, FlowConfig, ModbusConfig, SerialConfig};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    // Create a temporary directory
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Create a custom config
    let config = Config {
        serial: SerialConfig {
            device: "/dev/ttyUSB1".to_string(),
            baud_rate: 9600,
            frame_capacity: 32,
            poll_interval_ms: 50,
        },
        modbus: ModbusConfig {
            enabled: true,
            port: 5020,
            address: "0.0.0.0".to_string(),
            unit_id: 3,
        },
        flow: FlowConfig {
            pulses_per_unit: 450.0,
            publish_period_ms: 250,
        },
    };

    // Save config to file
    config.save_to_file(&config_path)?;

    // Load config from file
    let loaded_config = Config::from_file(&config_path)?;

    // Verify loaded config matches original
    assert_eq!(loaded_config.serial.device, "/dev/ttyUSB1");
    assert_eq!(loaded_config.serial.baud_rate, 9600);
    assert_eq!(loaded_config.serial.frame_capacity, 32);
    assert_eq!(loaded_config.modbus.port, 5020);
    assert_eq!(loaded_config.modbus.unit_id, 3);
    assert_eq!(loaded_config.flow.pulses_per_unit, 450.0);
    assert_eq!(loaded_config.flow.publish_period_ms, 250);

    Ok(())
}

#[test]
fn test_missing_file_creates_default() -> Result<()> {
    let temp_dir = tempdir()?;
    let non_existent_path = temp_dir.path().join("non_existent.yaml");

    let default_config = Config::from_file(&non_existent_path)?;

    // Verify default config was created
    assert!(non_existent_path.exists());
    assert_eq!(default_config.serial.device, "/dev/serial0");
    assert_eq!(default_config.serial.baud_rate, 115200);
    assert_eq!(default_config.serial.frame_capacity, 20);
    assert_eq!(default_config.modbus.port, 1502);
    assert_eq!(default_config.modbus.address, "127.0.0.1");
    assert_eq!(default_config.modbus.unit_id, 1);
    assert_eq!(default_config.flow.pulses_per_unit, 1200.0);
    assert_eq!(default_config.flow.publish_period_ms, 100);

    // The created file loads back to the same values
    let reloaded = Config::from_file(&non_existent_path)?;
    assert_eq!(reloaded.modbus.port, default_config.modbus.port);

    Ok(())
}

#[test]
fn test_partial_config_uses_section_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(
        &config_path,
        r#"
flow:
  pulses_per_unit: 600.0
  publish_period_ms: 200
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.flow.pulses_per_unit, 600.0);
    assert_eq!(config.flow.publish_period_ms, 200);
    assert_eq!(config.serial.device, "/dev/serial0");
    assert!(config.modbus.enabled);

    Ok(())
}

#[test]
fn test_apply_args() {
    let mut config = Config::default();
    assert_eq!(config.modbus.port, 1502);
    assert_eq!(config.modbus.address, "127.0.0.1");

    // Apply command-line arguments
    config.apply_args(
        Some("/dev/ttyAMA0".to_string()),
        Some(57600),
        Some("192.168.0.1".to_string()),
        Some(9000),
        Some(17),
        Some(330.0),
        Some(500),
    );

    // Verify values were overridden
    assert_eq!(config.serial.device, "/dev/ttyAMA0");
    assert_eq!(config.serial.baud_rate, 57600);
    assert_eq!(config.modbus.address, "192.168.0.1");
    assert_eq!(config.modbus.port, 9000);
    assert_eq!(config.modbus.unit_id, 17);
    assert_eq!(config.flow.pulses_per_unit, 330.0);
    assert_eq!(config.flow.publish_period_ms, 500);
    assert!(config.validate().is_ok());

    // Absent arguments leave the configuration untouched
    config.apply_args(None, None, None, None, None, None, None);
    assert_eq!(config.modbus.port, 9000);
    assert_eq!(config.serial.device, "/dev/ttyAMA0");
}

#[test]
fn test_override_is_validated() {
    let mut config = Config::default();
    config.apply_args(None, None, None, None, None, Some(0.0), None);
    assert!(config.validate().is_err());
}
