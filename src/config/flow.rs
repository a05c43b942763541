// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Flow derivation and publishing configuration

use serde::{Deserialize, Serialize};

/// Calibration and timing of the register publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Sensor pulses per unit of volume (e.g. pulses per litre).
    ///
    /// The flow rate in units per minute is `frequency * 60 / pulses_per_unit`.
    /// Must be greater than zero.
    pub pulses_per_unit: f32,

    /// Period in milliseconds between two publish ticks.
    pub publish_period_ms: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            pulses_per_unit: 1200.0,
            publish_period_ms: 100,
        }
    }
}
