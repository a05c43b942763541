// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Line framing for the sensor serial stream
//!
//! The sensor sends one decimal frequency per line, terminated by `\n`. Bytes
//! arrive in chunks of any size, so partial lines are buffered between calls
//! to [`LineFrameParser::feed`].

use log::{debug, warn};
use thiserror::Error;

use crate::utility::SharedReading;

/// Line terminator sent by the sensor
pub const FRAME_TERMINATOR: u8 = b'\n';

/// Default frame buffer capacity in bytes
pub const DEFAULT_FRAME_CAPACITY: usize = 20;

/// Reasons a frame was not accepted as a reading
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    /// The line is valid text but not a number
    #[error("malformed frame: {text:?}")]
    Malformed { text: String },

    /// The line is not valid UTF-8
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// The line parsed to NaN or an infinity
    #[error("frame value {value} is not finite")]
    NonFinite { value: f32 },

    /// No terminator arrived within the buffer capacity
    #[error("frame buffer overflow, no terminator within {capacity} bytes")]
    Overflow { capacity: usize },
}

/// Counters kept by the parser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Frames parsed and stored as the current reading
    pub accepted: u64,
    /// Complete frames discarded because they could not be parsed
    pub rejected: u64,
    /// Partial lines dropped on buffer overflow
    pub overflows: u64,
}

/// Reassembles newline-terminated frames and stores each parsed value into the
/// shared reading
///
/// The parser owns its buffer; it is moved into the serial reader task and is
/// the only producer of the [`SharedReading`] it was built with.
#[derive(Debug)]
pub struct LineFrameParser {
    reading: SharedReading,
    buffer: Vec<u8>,
    capacity: usize,
    stats: ReaderStats,
}

impl LineFrameParser {
    /// Create a parser writing into `reading`, buffering at most `capacity`
    /// bytes of a pending line.
    pub fn new(reading: SharedReading, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            reading,
            buffer: Vec::with_capacity(capacity),
            capacity,
            stats: ReaderStats::default(),
        }
    }

    /// Process a chunk of bytes in order
    ///
    /// Returns the number of frames accepted within the chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> usize {
        chunk
            .iter()
            .filter_map(|&byte| self.push(byte))
            .filter(Result::is_ok)
            .count()
    }

    /// Process a single byte
    ///
    /// Returns `Some` when the byte completed a frame (accepted or rejected)
    /// or caused an overflow, `None` when it was only buffered.
    pub fn push(&mut self, byte: u8) -> Option<Result<f32, FrameError>> {
        if byte == FRAME_TERMINATOR {
            let outcome = parse_frame(&self.buffer);
            self.buffer.clear();

            match &outcome {
                Ok(value) => {
                    self.reading.set(*value);
                    self.stats.accepted += 1;
                    debug!("Data received: {}", value);
                }
                Err(err) => {
                    self.stats.rejected += 1;
                    warn!("Discarding frame: {}", err);
                }
            }
            return Some(outcome);
        }

        if self.buffer.len() == self.capacity {
            // The overflowing byte belongs to the dropped line as well.
            self.buffer.clear();
            self.stats.overflows += 1;
            warn!(
                "Frame buffer overflow after {} bytes, dropping partial line",
                self.capacity
            );
            return Some(Err(FrameError::Overflow {
                capacity: self.capacity,
            }));
        }

        self.buffer.push(byte);
        None
    }

    /// Drop the pending line and reset the reading to zero
    ///
    /// Used when the sensor line goes away, so the last frequency is not
    /// published as a flow that is still running.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.reading.set(0.0);
    }

    /// Number of bytes of the pending, unterminated line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Maximum number of bytes buffered for one line
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }
}

/// Decode and parse the text of one frame, terminator excluded
fn parse_frame(bytes: &[u8]) -> Result<f32, FrameError> {
    let text = std::str::from_utf8(bytes).map_err(|_| FrameError::InvalidUtf8)?;
    let text = text.trim_end_matches('\0').trim();

    let value: f32 = text.parse().map_err(|_| FrameError::Malformed {
        text: text.to_string(),
    })?;

    if !value.is_finite() {
        return Err(FrameError::NonFinite { value });
    }
    Ok(value)
}
