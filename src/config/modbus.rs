// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP server configuration
//!
//! This module defines the structures for configuring the Modbus TCP server
//! that exposes the flow registers.

use serde::{Deserialize, Serialize};

/// Configuration for the Modbus TCP server component.
///
/// # Fields
///
/// * `enabled` - Flag to enable or disable the Modbus server
/// * `port` - TCP port number for the Modbus server (default: 1502)
/// * `address` - Network address for the Modbus server to bind to (default: 127.0.0.1)
/// * `unit_id` - Modbus unit identifier answered by the server (default: 1)
///
/// # Example
///
/// ```
/// use flow_modbus_bridge::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     enabled: true,
///     port: 502,
///     address: "0.0.0.0".to_string(),
///     unit_id: 1,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Flag to enable or disable the Modbus server.
    ///
    /// When disabled the publisher still maintains the register map, but no
    /// client can read it.
    pub enabled: bool,

    /// The TCP port the Modbus server will listen on.
    ///
    /// Port 0 lets the operating system pick a free port.
    pub port: u16,

    /// The network address the Modbus server will bind to.
    ///
    /// Use "0.0.0.0" to bind to all IPv4 interfaces.
    pub address: String,

    /// Unit identifier (slave id) the server answers to.
    ///
    /// Requests addressed to 255 are always served as well.
    pub unit_id: u8,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 1502,                       // Unprivileged alternative to 502
            address: "127.0.0.1".to_string(), // Localhost for security
            unit_id: 1,
        }
    }
}
