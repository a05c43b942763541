// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the serial flow sensor to Modbus bridge
use anyhow::Result;
use clap::Parser;
use flow_modbus_bridge::config::{self, Config};
use flow_modbus_bridge::daemon::Daemon;
use log::info;

use std::path::PathBuf;
use tokio::signal;

/// Serial pulse-frequency flow sensor to Modbus TCP bridge
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Serial device connected to the flow sensor
    #[arg(long)]
    serial_device: Option<String>,

    /// Serial line baud rate
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Modbus server address
    #[arg(long)]
    modbus_address: Option<String>,

    /// Modbus server port
    #[arg(long)]
    modbus_port: Option<u16>,

    /// Modbus unit id answered by the server
    #[arg(long)]
    unit_id: Option<u8>,

    /// Sensor pulses per unit of volume
    #[arg(long)]
    pulses_per_unit: Option<f32>,

    /// Register publishing period in milliseconds
    #[arg(long)]
    publish_period_ms: Option<u64>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger with appropriate level based on verbose and quiet flags
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    // Check if --show-config-schema flag is set
    if args.show_config_schema {
        return config::output_config_schema();
    }

    // Validate configuration file if --validate-config is set
    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    // Apply command line overrides
    config.apply_args(
        args.serial_device.clone(),
        args.baud_rate,
        args.modbus_address.clone(),
        args.modbus_port,
        args.unit_id,
        args.pulses_per_unit,
        args.publish_period_ms,
    );
    config
        .validate()
        .map_err(|err| anyhow::anyhow!("Invalid command line override: {}", err))?;

    info!("Starting in daemon mode");
    let mut daemon = Daemon::new();

    // Launch all configured tasks
    daemon.launch(&config).await?;

    // Wait for termination signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, terminating daemon");
            daemon.shutdown();
            daemon.join().await?;
        }
        Err(err) => {
            eprintln!("Error waiting for shutdown signal: {}", err);
        }
    }

    Ok(())
}
