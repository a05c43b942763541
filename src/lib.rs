// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Flow Modbus bridge library
//!
//! This library reads pulse frequency frames from a serial flow sensor and
//! publishes the frequency, flow rate and fill time as Modbus holding registers.

pub mod config;
pub mod daemon;
pub mod error;
pub mod modbus;
pub mod publisher;
pub mod serial;
pub mod utility;
