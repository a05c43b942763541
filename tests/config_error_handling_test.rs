// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use flow_modbus_bridge::config::Config;
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

#[test]
fn test_config_schema_error_creates_sample_file() -> Result<()> {
    // Initialize the logger
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Valid YAML but wrong types for the schema
    let invalid_yaml = r#"
modbus:
  enabled: "true"         # Boolean field with string value
  port: "not-an-integer"  # Integer field with string value
  address: 12345          # String field with number value
  unit_id: 1
"#;

    fs::write(&config_path, invalid_yaml)?;

    // Try to load the config, which should fail but create a sample file
    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        Path::new(&sample_path).exists(),
        "Sample config file was not created"
    );

    // Load and verify the sample file is valid
    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config.modbus.port, 1502);

    Ok(())
}

#[test]
fn test_out_of_range_unit_id_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(
        &config_path,
        r#"
modbus:
  enabled: true
  port: 1502
  address: "127.0.0.1"
  unit_id: 300
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}

#[test]
fn test_unknown_section_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(
        &config_path,
        r#"
visualization:
  port: 8080
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}

#[test]
fn test_invalid_listen_address_fails_specific_rules() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Passes the schema, fails the address check
    fs::write(
        &config_path,
        r#"
modbus:
  enabled: true
  port: 1502
  address: "not an address"
  unit_id: 1
"#,
    )?;

    let err = Config::from_file(&config_path).unwrap_err();
    println!("Expected error: {:#}", err);
    assert!(config_path.with_extension("sample.yaml").exists());
    Ok(())
}

#[test]
fn test_malformed_yaml_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(&config_path, "serial: [unterminated")?;

    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}
