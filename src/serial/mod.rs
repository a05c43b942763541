// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensor serial line acquisition
//!
//! - [`frame_parser`]: turns the raw byte stream into frequency readings.
//! - [`reader`]: opens the serial device and drives the parser from a task.

pub mod frame_parser;
pub mod reader;

pub use frame_parser::{FrameError, LineFrameParser, ReaderStats, DEFAULT_FRAME_CAPACITY};
pub use reader::{open_serial_port, SerialReader};
