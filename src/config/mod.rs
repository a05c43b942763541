// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the flow bridge
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! - `serial`: Settings for the sensor serial line
//! - `modbus`: Settings for the Modbus TCP server
//! - `flow`: Calibration constant and publish period
//!
//! ## Usage
//!
//! ```no_run
//! use flow_modbus_bridge::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("/dev/ttyUSB0".to_string()), // Serial device
//!     None,                             // Baud rate
//!     Some("0.0.0.0".to_string()),      // Modbus address
//!     Some(502),                        // Modbus port
//!     None,                             // Unit id
//!     Some(450.0),                      // Pulses per unit
//!     None,                             // Publish period
//! );
//!
//! println!("Modbus port: {}", config.modbus.port);
//! ```

pub mod flow;
pub mod modbus;
pub mod serial;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use flow::FlowConfig;
pub use modbus::ModbusConfig;
pub use serial::SerialConfig;
pub use utils::{is_valid_ip_address, output_config_schema};

/// JSON schema every configuration file is validated against
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure for the flow bridge.
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, allowing for minimal configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Settings for the sensor serial line.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Settings for the Modbus TCP server, such as enabling/disabling it,
    /// the port to use, the address and the unit id.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Flow-rate calibration and publishing period.
    #[serde(default)]
    pub flow: FlowConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file that fails
    /// schema validation, deserialization or the additional rules of
    /// [`utils::validate_specific_rules`] is rejected, and a
    /// `<name>.sample.yaml` with default values is written next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Check the additional rules not expressed by the JSON schema
    pub fn validate(&self) -> Result<()> {
        utils::validate_specific_rules(self)
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values explicitly provided override the existing configuration.
    ///
    /// # Parameters
    ///
    /// * `serial_device` - Path of the sensor serial device
    /// * `baud_rate` - Serial line baud rate
    /// * `modbus_address` - Network address for the Modbus server
    /// * `modbus_port` - TCP port for the Modbus server
    /// * `unit_id` - Modbus unit id answered by the server
    /// * `pulses_per_unit` - Flow sensor calibration constant
    /// * `publish_period_ms` - Register publishing period
    pub fn apply_args(
        &mut self,
        serial_device: Option<String>,
        baud_rate: Option<u32>,
        modbus_address: Option<String>,
        modbus_port: Option<u16>,
        unit_id: Option<u8>,
        pulses_per_unit: Option<f32>,
        publish_period_ms: Option<u64>,
    ) {
        if let Some(device) = serial_device {
            debug!("Overriding serial device from command line: {}", device);
            self.serial.device = device;
        }
        if let Some(baud) = baud_rate {
            debug!("Overriding baud rate from command line: {}", baud);
            self.serial.baud_rate = baud;
        }

        // Apply Modbus settings
        if let Some(address) = modbus_address {
            debug!("Overriding Modbus address from command line: {}", address);
            self.modbus.address = address;
        }
        if let Some(port) = modbus_port {
            debug!("Overriding Modbus port from command line: {}", port);
            self.modbus.port = port;
        }
        if let Some(unit_id) = unit_id {
            debug!("Overriding Modbus unit id from command line: {}", unit_id);
            self.modbus.unit_id = unit_id;
        }

        if let Some(pulses) = pulses_per_unit {
            debug!("Overriding pulses per unit from command line: {}", pulses);
            self.flow.pulses_per_unit = pulses;
        }
        if let Some(period) = publish_period_ms {
            debug!("Overriding publish period from command line: {} ms", period);
            self.flow.publish_period_ms = period;
        }
    }
}
