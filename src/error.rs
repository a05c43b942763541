// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Startup error types
//!
//! Runtime faults (malformed frames, rejected register writes) are absorbed
//! and logged where they happen. Only resource acquisition at startup can
//! abort the daemon, through [`BridgeError`].

use thiserror::Error;

/// Errors that prevent the bridge from starting
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The serial device could not be opened
    #[error("failed to open serial device {device}: {source}")]
    SerialOpen {
        device: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// The Modbus listener could not be bound
    #[error("failed to bind Modbus server on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}
