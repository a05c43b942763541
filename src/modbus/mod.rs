// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module provides the holding register map written by the register
//! publisher and the Modbus TCP service that lets external systems read it.
//!
//! ## Key Components
//!
//! - [`RegisterMap`]: thread-safe storage for the published registers.
//! - [`FlowModbusServer`]: the `tokio-modbus` service answering read requests.
//! - [`float_codec`]: the two-register `f32` encoding used by every slot.
//!
//! ## Register Map
//!
//! - Registers 0-1: Sensor frequency (Hz)
//! - Registers 2-3: Flow rate (units per minute)
//! - Registers 4-5: Fill time (seconds)

pub mod float_codec;
pub mod modbus_server;
pub mod register_map;

pub use modbus_server::FlowModbusServer;
pub use register_map::{FloatSlot, RegisterError, RegisterMap, RegisterSink};
