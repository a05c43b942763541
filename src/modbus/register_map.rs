// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Holding register storage shared by the publisher and the Modbus server
//!
//! ## Register Map
//!
//! | Register Address | Description | Unit | Encoding |
//! |-----------------|-------------|------|----------|
//! | 0-1 | Sensor frequency | Hz | `f32`, see [`float_codec`](super::float_codec) |
//! | 2-3 | Flow rate | units/min | `f32` |
//! | 4-5 | Fill time | s | `f32` |

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use thiserror::Error;

use super::float_codec::{decode_f32, encode_f32, FLOAT_WORDS};

/// A named two-word float slot of the register map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatSlot {
    Frequency,
    FlowRate,
    FillTime,
}

impl FloatSlot {
    /// Every slot, in address order
    pub const ALL: [FloatSlot; 3] = [FloatSlot::Frequency, FloatSlot::FlowRate, FloatSlot::FillTime];

    /// Address of the low word of the slot
    pub const fn address(self) -> u16 {
        match self {
            FloatSlot::Frequency => 0,
            FloatSlot::FlowRate => 2,
            FloatSlot::FillTime => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            FloatSlot::Frequency => "FREQUENCY",
            FloatSlot::FlowRate => "FLOWRATE",
            FloatSlot::FillTime => "FILLTIME",
        }
    }
}

/// Number of registers covered by the float slots
pub const REGISTER_COUNT: u16 = (FloatSlot::ALL.len() * FLOAT_WORDS) as u16;

/// Errors raised by register access
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// The address is not part of the map
    #[error("illegal register address {0}")]
    IllegalAddress(u16),

    /// A thread panicked while holding the register lock
    #[error("register map lock poisoned")]
    Poisoned,
}

/// Destination of published register words
///
/// Implemented by [`RegisterMap`]; tests substitute a mock to observe the
/// writes performed by the publisher.
#[cfg_attr(test, mockall::automock)]
pub trait RegisterSink {
    /// Write `words` at consecutive addresses starting from `address`, all or
    /// nothing.
    fn write_points(&self, address: u16, words: &[u16]) -> Result<(), RegisterError>;
}

/// A thread-safe, pre-sized holding register map
///
/// Clones share the same storage. Bulk writes validate every address before
/// touching any register and run under a single lock, so a concurrent reader
/// never observes half of a two-word float.
#[derive(Debug, Clone)]
pub struct RegisterMap {
    registers: Arc<Mutex<HashMap<u16, u16>>>,
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterMap {
    /// Create the map with the FREQUENCY, FLOWRATE and FILLTIME registers,
    /// all zero (0.0).
    pub fn new() -> Self {
        Self::with_size(REGISTER_COUNT)
    }

    /// Create a map holding registers `0..size`, all zero
    pub fn with_size(size: u16) -> Self {
        let registers = (0..size).map(|addr| (addr, 0)).collect();
        Self {
            registers: Arc::new(Mutex::new(registers)),
        }
    }

    /// Read `count` registers starting from `address`
    pub fn read_points(&self, address: u16, count: u16) -> Result<Vec<u16>, RegisterError> {
        let registers = self.registers.lock().map_err(|_| RegisterError::Poisoned)?;
        (0..count)
            .map(|i| {
                let reg_addr = offset(address, i)?;
                registers
                    .get(&reg_addr)
                    .copied()
                    .ok_or(RegisterError::IllegalAddress(reg_addr))
            })
            .collect()
    }

    /// Decode the float stored in `slot`
    pub fn read_float(&self, slot: FloatSlot) -> Result<f32, RegisterError> {
        let words = self.read_points(slot.address(), FLOAT_WORDS as u16)?;
        Ok(decode_f32([words[0], words[1]]))
    }

    /// Encode `value` into `slot`
    pub fn write_float(&self, slot: FloatSlot, value: f32) -> Result<(), RegisterError> {
        self.write_points(slot.address(), &encode_f32(value))
    }
}

impl RegisterSink for RegisterMap {
    fn write_points(&self, address: u16, words: &[u16]) -> Result<(), RegisterError> {
        let mut registers = self.registers.lock().map_err(|_| RegisterError::Poisoned)?;

        let count = u16::try_from(words.len()).map_err(|_| RegisterError::IllegalAddress(address))?;
        for i in 0..count {
            let reg_addr = offset(address, i)?;
            if !registers.contains_key(&reg_addr) {
                return Err(RegisterError::IllegalAddress(reg_addr));
            }
        }

        for (i, value) in (0..count).zip(words) {
            registers.insert(address + i, *value);
        }
        Ok(())
    }
}

fn offset(address: u16, i: u16) -> Result<u16, RegisterError> {
    address
        .checked_add(i)
        .ok_or(RegisterError::IllegalAddress(address))
}
