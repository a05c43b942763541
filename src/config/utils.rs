// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::{Config, CONFIG_SCHEMA};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./flow_modbus_bridge --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Calibration**: `pulses_per_unit` must be finite and greater than zero
/// - **Publish period**: must be greater than zero
/// - **Serial line**: device path must not be empty, baud rate and frame
///   capacity must be greater than zero
/// - **IP Address Format**: the Modbus address must parse as an IP address
///   when the server is enabled
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let pulses = config.flow.pulses_per_unit;
    if !pulses.is_finite() || pulses <= 0.0 {
        anyhow::bail!("Invalid pulses_per_unit {}: must be greater than zero", pulses);
    }

    if config.flow.publish_period_ms == 0 {
        anyhow::bail!("Invalid publish_period_ms: must be greater than zero");
    }

    if config.serial.device.trim().is_empty() {
        anyhow::bail!("Serial device path is empty");
    }
    if config.serial.baud_rate == 0 {
        anyhow::bail!("Invalid serial baud rate: must be greater than zero");
    }
    if config.serial.frame_capacity == 0 {
        anyhow::bail!("Invalid frame_capacity: must be greater than zero");
    }
    if config.serial.poll_interval_ms == 0 {
        anyhow::bail!("Invalid poll_interval_ms: must be greater than zero");
    }

    if config.modbus.enabled && !is_valid_ip_address(&config.modbus.address) {
        anyhow::bail!("Invalid Modbus address: {}", config.modbus.address);
    }

    Ok(())
}
