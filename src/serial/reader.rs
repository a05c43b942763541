// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial reader task
//!
//! The reader owns the serial stream and the [`LineFrameParser`]. Bytes are
//! handed to the parser in arrival order by a single task, so parsing is never
//! re-entrant. Each read waits at most `poll_interval` so that the task notices
//! a shutdown request promptly even when the line is silent.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::time;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use super::frame_parser::{LineFrameParser, ReaderStats};
use crate::config::SerialConfig;
use crate::error::BridgeError;

/// Size of the buffer used for one read from the stream
const READ_CHUNK: usize = 64;

/// Open the sensor serial device as 8N1 at the configured baud rate
pub fn open_serial_port(config: &SerialConfig) -> Result<SerialStream, BridgeError> {
    info!(
        "Opening serial device {} at {} baud",
        config.device, config.baud_rate
    );
    tokio_serial::new(&config.device, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .open_native_async()
        .map_err(|source| BridgeError::SerialOpen {
            device: config.device.clone(),
            source,
        })
}

/// Drives a [`LineFrameParser`] from an asynchronous byte stream
pub struct SerialReader<S> {
    stream: S,
    parser: LineFrameParser,
    poll_interval: Duration,
    stats: watch::Sender<ReaderStats>,
}

impl<S: AsyncRead + Unpin> SerialReader<S> {
    pub fn new(stream: S, parser: LineFrameParser, poll_interval: Duration) -> Self {
        let (stats, _) = watch::channel(parser.stats());
        Self {
            stream,
            parser,
            poll_interval,
            stats,
        }
    }

    /// Subscribe to the parser counters, updated after every chunk read
    pub fn subscribe_stats(&self) -> watch::Receiver<ReaderStats> {
        self.stats.subscribe()
    }

    /// Read and parse until `running` is cleared
    ///
    /// Read errors are logged and the loop goes on; the partial line in the
    /// parser is kept so no received byte is lost. End of stream is treated
    /// as a lost sensor line: the reading is reset to zero and the stream is
    /// polled again after `poll_interval`. The stream is dropped when this
    /// returns.
    pub async fn run(mut self, running: Arc<AtomicBool>) -> ReaderStats {
        info!("Serial reader started");
        let mut buf = [0u8; READ_CHUNK];
        let mut line_lost = false;

        while running.load(Ordering::SeqCst) {
            match time::timeout(self.poll_interval, self.stream.read(&mut buf)).await {
                // Nothing received within the poll interval
                Err(_) => continue,
                Ok(Ok(0)) => {
                    if !line_lost {
                        warn!("Serial stream closed, reading reset to 0 until data resumes");
                        self.parser.clear();
                        line_lost = true;
                    }
                    time::sleep(self.poll_interval).await;
                }
                Ok(Ok(n)) => {
                    if line_lost {
                        info!("Serial stream resumed");
                        line_lost = false;
                    }
                    let accepted = self.parser.feed(&buf[..n]);
                    debug!("Read {} bytes, {} frames accepted", n, accepted);
                    self.stats.send_replace(self.parser.stats());
                }
                Ok(Err(err)) => {
                    error!("Serial read error: {}", err);
                    time::sleep(self.poll_interval).await;
                }
            }
        }

        let stats = self.parser.stats();
        info!(
            "Serial reader stopped: {} frames accepted, {} rejected, {} overflows",
            stats.accepted, stats.rejected, stats.overflows
        );
        stats
    }
}
