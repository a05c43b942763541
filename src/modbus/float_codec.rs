// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Two-register encoding of `f32` values
//!
//! Each float occupies two consecutive 16-bit registers. The 4 bytes of the
//! IEEE-754 representation are taken in little-endian order:
//!
//! | Register | Content |
//! |----------|---------|
//! | address     | bytes 0..2 as little-endian `u16` (low half of the bits) |
//! | address + 1 | bytes 2..4 as little-endian `u16` (high half of the bits) |
//!
//! In Modbus client tools this layout is usually called "CDAB" or
//! "word-swapped float". It does not depend on the host byte order.
//!
//! ```
//! use flow_modbus_bridge::modbus::float_codec::{decode_f32, encode_f32};
//!
//! assert_eq!(encode_f32(1.0), [0x0000, 0x3F80]);
//! assert_eq!(decode_f32([0x0000, 0x3F80]), 1.0);
//! ```

/// Number of registers used by one encoded float
pub const FLOAT_WORDS: usize = 2;

/// Split `value` into its low-address and high-address register words
pub fn encode_f32(value: f32) -> [u16; FLOAT_WORDS] {
    let bytes = value.to_le_bytes();
    [
        u16::from_le_bytes([bytes[0], bytes[1]]),
        u16::from_le_bytes([bytes[2], bytes[3]]),
    ]
}

/// Rebuild a float from the two words produced by [`encode_f32`]
pub fn decode_f32(words: [u16; FLOAT_WORDS]) -> f32 {
    let low = words[0].to_le_bytes();
    let high = words[1].to_le_bytes();
    f32::from_le_bytes([low[0], low[1], high[0], high[1]])
}
