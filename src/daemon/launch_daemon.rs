// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! This module runs and coordinates the background tasks of the bridge:
//!
//! - Serial reader feeding the shared reading
//! - Register publisher writing the flow registers
//! - Modbus TCP server exposing the registers
//! - System health monitoring (heartbeat)
//!
//! ## Architecture
//!
//! Every service runs as an independent Tokio task. The reader and the
//! publisher only share the [`SharedReading`]; the publisher and the Modbus
//! server share the [`RegisterMap`]. All tasks poll a common `running` flag and
//! finish once [`Daemon::shutdown`] clears it.
//!
//! Resources are acquired before any task is spawned: if the serial device
//! cannot be opened or the Modbus listener cannot be bound, [`Daemon::launch`]
//! fails and nothing runs.
//!
//! ## Usage
//!
//! ```no_run
//! use flow_modbus_bridge::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Later, trigger a graceful shutdown
//!     daemon.shutdown();
//!
//!     // Wait for all tasks to complete
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use log::{debug, error, info, warn};
use std::time::Duration;
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::io::AsyncRead;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use crate::config::Config;
use crate::error::BridgeError;
use crate::modbus::{FloatSlot, FlowModbusServer, RegisterMap};
use crate::publisher::RegisterPublisher;
use crate::serial::{open_serial_port, LineFrameParser, ReaderStats, SerialReader};
use crate::utility::SharedReading;

/// Interval between two heartbeat log lines
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(60);

/// Granularity at which idle tasks check the `running` flag
const SHUTDOWN_POLL: Duration = Duration::from_secs(1);

/// Maximum time `join` waits for each task
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Represents a daemon task manager that coordinates the bridge services
///
/// # Fields
///
/// * `tasks` - Collection of handles to running tasks for management and cleanup
/// * `running` - Atomic flag shared between tasks to coordinate shutdown
/// * `reading` - Latest sensor reading, written by the serial reader
/// * `registers` - Register map written by the publisher and served over Modbus
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    reading: SharedReading,
    registers: RegisterMap,
    modbus_addr: Option<SocketAddr>,
    reader_stats: Option<watch::Receiver<ReaderStats>>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// Initializes a new daemon manager with an empty task list, the
    /// running flag set to `true`, a zero reading and a zeroed register map.
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            reading: SharedReading::new(),
            registers: RegisterMap::new(),
            modbus_addr: None,
            reader_stats: None,
        }
    }

    /// Open the configured serial device and launch all tasks
    ///
    /// # Errors
    ///
    /// * The configuration breaks a validation rule
    /// * The serial device cannot be opened
    /// * The Modbus server fails to bind to the configured address
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        config.validate()?;
        let stream = open_serial_port(&config.serial)?;
        self.launch_with_stream(config, stream).await
    }

    /// Launch all tasks, reading sensor frames from `stream`
    ///
    /// The configuration is validated and the Modbus listener is bound before
    /// anything is spawned, so a startup failure leaves no task behind.
    pub async fn launch_with_stream<S>(&mut self, config: &Config, stream: S) -> Result<()>
    where
        S: AsyncRead + Unpin + Send + 'static,
    {
        config.validate()?;
        let listener = if config.modbus.enabled {
            Some(bind_modbus_listener(config).await?)
        } else {
            info!("Modbus server disabled");
            None
        };

        self.start_serial_reader(config, stream);
        self.start_register_publisher(config);

        if let Some(listener) = listener {
            self.start_modbus_server(config, listener)?;
        }

        self.start_heartbeat();
        Ok(())
    }

    /// Spawn the task that feeds the frame parser from the serial stream
    fn start_serial_reader<S>(&mut self, config: &Config, stream: S)
    where
        S: AsyncRead + Unpin + Send + 'static,
    {
        info!(
            "Starting serial reader on {} (frame capacity {} bytes)",
            config.serial.device, config.serial.frame_capacity
        );

        let parser = LineFrameParser::new(self.reading.clone(), config.serial.frame_capacity);
        let reader = SerialReader::new(
            stream,
            parser,
            Duration::from_millis(config.serial.poll_interval_ms),
        );
        self.reader_stats = Some(reader.subscribe_stats());

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            reader.run(running).await;
            Ok(())
        });

        self.tasks.push(task);
    }

    /// Spawn the periodic register publisher
    fn start_register_publisher(&mut self, config: &Config) {
        let period = Duration::from_millis(config.flow.publish_period_ms);
        info!(
            "Starting register publisher every {:?} with {} pulses per unit",
            period, config.flow.pulses_per_unit
        );

        let publisher = RegisterPublisher::new(
            self.reading.clone(),
            self.registers.clone(),
            config.flow.pulses_per_unit,
        );

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            publisher.run(period, running).await;
            Ok(())
        });

        self.tasks.push(task);
    }

    /// Launch the modbus server daemon
    ///
    /// Serves the register map to Modbus TCP clients until the daemon's
    /// `running` flag is set to `false`, then aborts the server task.
    fn start_modbus_server(&mut self, config: &Config, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        self.modbus_addr = Some(local_addr);
        info!(
            "Starting modbus server on {} for unit {}",
            local_addr, config.modbus.unit_id
        );

        let running = self.running.clone();
        let registers = self.registers.clone();
        let unit_id = config.modbus.unit_id;

        let task = tokio::spawn(async move {
            let server = Server::new(listener);

            // Each connection gets its own service over the shared registers
            let on_connected = move |stream, socket_addr| {
                let registers = registers.clone();
                async move {
                    accept_tcp_connection(stream, socket_addr, move |socket_addr| {
                        debug!("Modbus client connected from {}", socket_addr);
                        Ok(Some(FlowModbusServer::new(registers.clone(), unit_id)))
                    })
                }
            };

            let on_process_error = |err| {
                error!("Modbus server error: {err}");
            };

            let server_handle = tokio::spawn(async move {
                if let Err(e) = server.serve(&on_connected, on_process_error).await {
                    error!("Modbus server error: {}", e);
                }
            });

            while running.load(Ordering::SeqCst) {
                time::sleep(SHUTDOWN_POLL).await;
            }

            info!("Shutting down Modbus server...");
            server_handle.abort();

            match time::timeout(JOIN_TIMEOUT, server_handle).await {
                Ok(_) => info!("Modbus server shut down successfully"),
                Err(_) => {
                    warn!("Modbus server shutdown timed out, forcing termination");
                }
            }

            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs the bridge status periodically
    fn start_heartbeat(&mut self) {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let reading = self.reading.clone();
        let registers = self.registers.clone();
        let reader_stats = self.reader_stats.clone();

        let task = tokio::spawn(async move {
            let mut elapsed = Duration::ZERO;
            while running.load(Ordering::SeqCst) {
                time::sleep(SHUTDOWN_POLL).await;
                elapsed += SHUTDOWN_POLL;
                if elapsed < HEARTBEAT_PERIOD {
                    continue;
                }
                elapsed = Duration::ZERO;

                let stats = reader_stats
                    .as_ref()
                    .map(|rx| *rx.borrow())
                    .unwrap_or_default();
                let fill_time = registers.read_float(FloatSlot::FillTime).unwrap_or(f32::NAN);
                debug!(
                    "Daemon heartbeat: reading {} Hz, fill time {} s, frames {} accepted / {} rejected / {} overflows",
                    reading.get(),
                    fill_time,
                    stats.accepted,
                    stats.rejected,
                    stats.overflows
                );
            }
            Ok(())
        });

        self.tasks.push(task);
    }

    /// Latest sensor reading shared with the tasks
    pub fn reading(&self) -> SharedReading {
        self.reading.clone()
    }

    /// Register map served over Modbus
    pub fn registers(&self) -> RegisterMap {
        self.registers.clone()
    }

    /// Address the Modbus server is listening on, once launched
    pub fn modbus_local_addr(&self) -> Option<SocketAddr> {
        self.modbus_addr
    }

    /// Stop all running tasks gracefully
    ///
    /// Signals all spawned tasks to terminate by setting the shared `running` flag to `false`.
    /// This method only signals the tasks to stop; call `join()` to wait for them.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for all tasks to complete
    ///
    /// Consumes the daemon and waits for each task, at most five seconds per
    /// task. Task panics and errors are logged but do not fail this method.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match time::timeout(JOIN_TIMEOUT, task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => error!("Task failed: {:#}", e),
                Ok(Err(e)) => error!("Task panicked: {}", e),
                Err(_) => {
                    warn!("Task did not complete within timeout period, may be hung");
                }
            }
        }
        Ok(())
    }
}

/// Bind the Modbus TCP listener on the configured address and port
async fn bind_modbus_listener(config: &Config) -> Result<TcpListener, BridgeError> {
    let address = format!("{}:{}", config.modbus.address, config.modbus.port);
    TcpListener::bind((config.modbus.address.as_str(), config.modbus.port))
        .await
        .map_err(|source| BridgeError::Bind { address, source })
}
