// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use clap::Parser;
use flow_modbus_bridge::modbus::float_codec::{decode_f32, FLOAT_WORDS};
use flow_modbus_bridge::modbus::register_map::REGISTER_COUNT;
use flow_modbus_bridge::modbus::FloatSlot;
use std::error::Error;
use tokio::time::Duration;
use tokio_modbus::prelude::*;

/// Modbus client for reading the flow registers published by the bridge
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Modbus server address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[clap(long, default_value = "1502")]
    port: u16,

    /// Unit id to address
    #[clap(long, default_value = "1")]
    unit_id: u8,

    /// Poll again every N milliseconds instead of reading once
    #[clap(long)]
    watch_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    // Parse command line arguments
    let args = Args::parse();

    // Format server address
    let socket_addr = format!("{}:{}", args.address, args.port).parse()?;
    println!("Connecting to Modbus server at {}", socket_addr);

    // Create TCP transport
    let mut ctx = tcp::connect_slave(socket_addr, Slave(args.unit_id)).await?;

    loop {
        let response = tokio::time::timeout(
            Duration::from_secs(1),
            ctx.read_holding_registers(0, REGISTER_COUNT),
        )
        .await???;

        println!(
            "[{}] Raw register values: {:?}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            response
        );

        for slot in FloatSlot::ALL {
            let start = slot.address() as usize;
            let Some(&[low, high]) = response.get(start..start + FLOAT_WORDS) else {
                println!("Registers {}-{}: missing from response", start, start + 1);
                continue;
            };
            println!(
                "Registers {}-{}: {} = {}",
                start,
                start + 1,
                slot.name(),
                decode_f32([low, high])
            );
        }

        match args.watch_ms {
            Some(period) => tokio::time::sleep(Duration::from_millis(period)).await,
            None => break,
        }
    }

    ctx.disconnect().await?;
    Ok(())
}
