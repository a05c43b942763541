// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Periodic publication of the flow measurements into the register map
//!
//! On every tick the publisher samples the shared reading, derives the flow
//! rate and fill time, and writes the encoded floats into the register map:
//!
//! - FREQUENCY and FLOWRATE only when the reading changed (exact bit
//!   comparison) since the last successful publication,
//! - FILLTIME on every tick.
//!
//! A rejected write is logged and retried on the next tick; it never stops
//! the publish loop.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use log::{debug, error, info};
use tokio::time::{self, MissedTickBehavior};

use super::fill_timer::FillTimer;
use crate::modbus::float_codec::encode_f32;
use crate::modbus::register_map::{FloatSlot, RegisterError, RegisterSink};
use crate::utility::SharedReading;

/// Seconds per minute, used to turn pulses per second into units per minute
const SECONDS_PER_MINUTE: f32 = 60.0;

/// Flow rate in units per minute for a pulse `frequency` in Hz
pub fn flow_rate(frequency: f32, pulses_per_unit: f32) -> f32 {
    frequency * SECONDS_PER_MINUTE / pulses_per_unit
}

/// Values computed during one publish tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishedMetrics {
    /// Reading sampled at the start of the tick, in Hz
    pub frequency: f32,
    /// Flow rate in units per minute
    pub flow_rate: f32,
    /// Seconds since the flow started, 0 when stopped
    pub fill_time: f32,
    /// Whether FREQUENCY and FLOWRATE were rewritten during this tick
    pub frequency_written: bool,
}

/// Owner of every write to the FREQUENCY, FLOWRATE and FILLTIME slots
pub struct RegisterPublisher<S> {
    reading: SharedReading,
    sink: S,
    pulses_per_unit: f32,
    fill_timer: FillTimer,
    last_published: Option<u32>,
}

impl<S: RegisterSink> RegisterPublisher<S> {
    /// Create a publisher sampling `reading` and writing into `sink`
    ///
    /// `pulses_per_unit` must be greater than zero; configuration loading
    /// enforces it.
    pub fn new(reading: SharedReading, sink: S, pulses_per_unit: f32) -> Self {
        Self {
            reading,
            sink,
            pulses_per_unit,
            fill_timer: FillTimer::new(),
            last_published: None,
        }
    }

    /// Run one publish tick using the current time
    ///
    /// The time comes from the tokio clock so paused-time tests drive the
    /// fill timer too.
    pub fn tick(&mut self) -> PublishedMetrics {
        self.tick_at(time::Instant::now().into_std())
    }

    /// Run one publish tick as if it happened at `now`
    pub fn tick_at(&mut self, now: Instant) -> PublishedMetrics {
        let frequency = self.reading.get();
        let flow_rate = flow_rate(frequency, self.pulses_per_unit);

        let changed = self.last_published != Some(frequency.to_bits());
        let mut frequency_written = false;
        if changed {
            let frequency_ok = self.write(FloatSlot::Frequency, frequency);
            let flow_rate_ok = self.write(FloatSlot::FlowRate, flow_rate);

            if frequency_ok && flow_rate_ok {
                self.last_published = Some(frequency.to_bits());
                frequency_written = true;
                debug!(
                    "Published frequency {} Hz, flow rate {} units/min",
                    frequency, flow_rate
                );
            }
        }

        let fill_time = self.fill_timer.update(frequency, now);
        self.write(FloatSlot::FillTime, fill_time);

        PublishedMetrics {
            frequency,
            flow_rate,
            fill_time,
            frequency_written,
        }
    }

    /// Tick every `period` until `running` is cleared
    pub async fn run(mut self, period: Duration, running: Arc<AtomicBool>) {
        info!("Register publisher started, period {:?}", period);

        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while running.load(Ordering::SeqCst) {
            interval.tick().await;
            self.tick();
        }

        info!("Register publisher stopped");
    }

    pub fn fill_timer(&self) -> &FillTimer {
        &self.fill_timer
    }

    fn write(&self, slot: FloatSlot, value: f32) -> bool {
        match self.sink.write_points(slot.address(), &encode_f32(value)) {
            Ok(()) => true,
            Err(err) => {
                log_write_failure(slot, &err);
                false
            }
        }
    }
}

fn log_write_failure(slot: FloatSlot, err: &RegisterError) {
    error!(
        "Failed to write {} at register {}: {}",
        slot.name(),
        slot.address(),
        err
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::register_map::{MockRegisterSink, RegisterMap};
    use approx::assert_relative_eq;
    use mockall::Sequence;

    fn expect_slot(sink: &mut MockRegisterSink, slot: FloatSlot, times: usize) {
        sink.expect_write_points()
            .withf(move |address, words| *address == slot.address() && words.len() == 2)
            .times(times)
            .returning(|_, _| Ok(()));
    }

    #[test]
    fn test_flow_rate_derivation() {
        assert_eq!(flow_rate(100.0, 1200.0), 5.0);
        assert_eq!(flow_rate(0.0, 1200.0), 0.0);
        assert_relative_eq!(flow_rate(37.5, 450.0), 5.0, epsilon = f32::EPSILON);
    }

    #[test]
    fn test_unchanged_reading_only_rewrites_fill_time() {
        let reading = SharedReading::with_value(100.0);
        let mut sink = MockRegisterSink::new();
        expect_slot(&mut sink, FloatSlot::Frequency, 1);
        expect_slot(&mut sink, FloatSlot::FlowRate, 1);
        expect_slot(&mut sink, FloatSlot::FillTime, 2);

        let mut publisher = RegisterPublisher::new(reading, sink, 1200.0);
        let t0 = Instant::now();

        let first = publisher.tick_at(t0);
        assert!(first.frequency_written);
        assert_eq!(first.flow_rate, 5.0);

        let second = publisher.tick_at(t0 + Duration::from_millis(100));
        assert!(!second.frequency_written);
    }

    #[test]
    fn test_changed_reading_is_republished() {
        let reading = SharedReading::with_value(10.0);
        let mut sink = MockRegisterSink::new();
        expect_slot(&mut sink, FloatSlot::Frequency, 2);
        expect_slot(&mut sink, FloatSlot::FlowRate, 2);
        expect_slot(&mut sink, FloatSlot::FillTime, 2);

        let mut publisher = RegisterPublisher::new(reading.clone(), sink, 1200.0);
        let t0 = Instant::now();
        publisher.tick_at(t0);
        reading.set(20.0);
        let metrics = publisher.tick_at(t0 + Duration::from_millis(100));
        assert!(metrics.frequency_written);
        assert_eq!(metrics.frequency, 20.0);
    }

    #[test]
    fn test_writes_encoded_words_in_slot_order() {
        let reading = SharedReading::with_value(100.0);
        let mut sink = MockRegisterSink::new();
        let mut seq = Sequence::new();

        sink.expect_write_points()
            .withf(|address, words| *address == 0 && words.to_vec() == vec![0x0000u16, 0x42C8])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        sink.expect_write_points()
            .withf(|address, words| *address == 2 && words.to_vec() == vec![0x0000u16, 0x40A0])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        sink.expect_write_points()
            .withf(|address, words| *address == 4 && words.to_vec() == vec![0x0000u16, 0x0000])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let mut publisher = RegisterPublisher::new(reading, sink, 1200.0);
        publisher.tick_at(Instant::now());
    }

    #[test]
    fn test_failed_write_is_retried_on_next_tick() {
        let reading = SharedReading::with_value(50.0);
        let mut sink = MockRegisterSink::new();
        let mut seq = Sequence::new();

        // First tick: FREQUENCY rejected, FLOWRATE and FILLTIME accepted
        sink.expect_write_points()
            .withf(|address, _| *address == 0)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|address, _| Err(RegisterError::IllegalAddress(address)));
        sink.expect_write_points()
            .withf(|address, _| *address == 2)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        sink.expect_write_points()
            .withf(|address, _| *address == 4)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        // Second tick: the unchanged reading is written again
        sink.expect_write_points()
            .withf(|address, _| *address == 0 || *address == 2 || *address == 4)
            .times(3)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let mut publisher = RegisterPublisher::new(reading, sink, 1200.0);
        let t0 = Instant::now();

        assert!(!publisher.tick_at(t0).frequency_written);
        assert!(publisher.tick_at(t0 + Duration::from_millis(100)).frequency_written);
    }

    #[test]
    fn test_fill_time_sequence() {
        let reading = SharedReading::with_value(5.0);
        let mut publisher = RegisterPublisher::new(reading.clone(), RegisterMap::new(), 1200.0);
        let t0 = Instant::now();

        assert_eq!(publisher.tick_at(t0).fill_time, 0.0);

        let metrics = publisher.tick_at(t0 + Duration::from_secs(1));
        assert_relative_eq!(metrics.fill_time, 1.0, epsilon = 1e-6);

        reading.set(0.0);
        let metrics = publisher.tick_at(t0 + Duration::from_millis(1500));
        assert_eq!(metrics.fill_time.to_bits(), 0.0f32.to_bits());
        assert!(!publisher.fill_timer().is_running());
    }

    #[test]
    fn test_register_map_receives_published_values() {
        let reading = SharedReading::with_value(100.0);
        let registers = RegisterMap::new();
        let mut publisher = RegisterPublisher::new(reading, registers.clone(), 1200.0);
        let t0 = Instant::now();

        publisher.tick_at(t0);
        publisher.tick_at(t0 + Duration::from_secs(2));

        assert_eq!(registers.read_float(FloatSlot::Frequency).unwrap(), 100.0);
        assert_eq!(registers.read_float(FloatSlot::FlowRate).unwrap(), 5.0);
        assert_relative_eq!(
            registers.read_float(FloatSlot::FillTime).unwrap(),
            2.0,
            epsilon = 1e-6
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_flag_is_cleared() {
        let reading = SharedReading::with_value(1.0);
        let registers = RegisterMap::new();
        let running = Arc::new(AtomicBool::new(true));

        let publisher = RegisterPublisher::new(reading, registers.clone(), 1200.0);
        let handle = tokio::spawn(publisher.run(Duration::from_millis(100), running.clone()));

        time::sleep(Duration::from_millis(350)).await;
        running.store(false, Ordering::SeqCst);
        handle.await.unwrap();

        assert_eq!(registers.read_float(FloatSlot::Frequency).unwrap(), 1.0);
        assert!(registers.read_float(FloatSlot::FillTime).unwrap() > 0.0);
    }
}
