// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Latest sensor reading shared between the serial reader and the publisher
//!
//! The serial reader is the only producer and the register publisher the only
//! consumer. Both sides hold a clone of the same [`SharedReading`] handle.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

/// A lock-free cell holding the most recent frequency reading in Hz
///
/// The `f32` is stored as its IEEE-754 bit pattern in an [`AtomicU32`], so a
/// concurrent [`get`](Self::get) always observes a complete value written by
/// some [`set`](Self::set), never a mix of two. Neither side ever blocks.
///
/// Superseded readings are discarded: only the latest value is kept.
#[derive(Debug, Clone, Default)]
pub struct SharedReading {
    bits: Arc<AtomicU32>,
}

impl SharedReading {
    /// Create a new cell holding 0.0 Hz
    pub fn new() -> Self {
        Self::with_value(0.0)
    }

    /// Create a new cell holding `value`
    pub fn with_value(value: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    /// Replace the current reading
    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Get the current reading
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}
