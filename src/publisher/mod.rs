// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register publishing
//!
//! The [`RegisterPublisher`] runs on its own task, samples the shared reading
//! on a fixed period and owns every write to the flow registers.

pub mod fill_timer;
pub mod register_publisher;

pub use fill_timer::FillTimer;
pub use register_publisher::{flow_rate, PublishedMetrics, RegisterPublisher};
