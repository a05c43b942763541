// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial line configuration
//!
//! This module defines the settings used to open the sensor serial device and
//! to frame its byte stream.

use serde::{Deserialize, Serialize};

/// Configuration for the sensor serial line.
///
/// The line is always opened as 8 data bits, no parity, one stop bit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Path of the serial device, e.g. `/dev/serial0` or `/dev/ttyUSB0`.
    pub device: String,

    /// Baud rate of the serial line.
    pub baud_rate: u32,

    /// Maximum number of bytes buffered for one unterminated line.
    ///
    /// A line longer than this is dropped.
    pub frame_capacity: usize,

    /// Upper bound in milliseconds on how long a single read waits for data
    /// before the reader checks for shutdown again.
    pub poll_interval_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/serial0".to_string(),
            baud_rate: 115_200,
            frame_capacity: crate::serial::DEFAULT_FRAME_CAPACITY,
            poll_interval_ms: 100,
        }
    }
}
