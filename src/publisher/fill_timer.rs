// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the flow-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Fill time tracking
//!
//! Fill time is the number of seconds the flow has been continuously running,
//! i.e. since the frequency last became nonzero.

use std::time::Instant;

/// Two-state elapsed time counter
///
/// The elapsed value is a pure function of the state and the instant passed
/// to [`update`](Self::update); the timer never reads the clock itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FillTimer {
    #[default]
    Stopped,
    Running {
        started: Instant,
    },
}

impl FillTimer {
    pub fn new() -> Self {
        Self::Stopped
    }

    /// Advance the timer with the current `frequency` observed at `now`
    ///
    /// Returns the fill time in seconds:
    /// - `0.0` and the timer stops when `frequency` is zero,
    /// - `0.0` and the timer starts on the first nonzero frequency,
    /// - the seconds elapsed since the start while the frequency stays nonzero.
    pub fn update(&mut self, frequency: f32, now: Instant) -> f32 {
        if frequency == 0.0 {
            *self = Self::Stopped;
            return 0.0;
        }

        match *self {
            Self::Stopped => {
                *self = Self::Running { started: now };
                0.0
            }
            Self::Running { started } => now.saturating_duration_since(started).as_secs_f32(),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    #[test]
    fn test_fill_time_follows_flow() {
        let t0 = Instant::now();
        let mut timer = FillTimer::new();

        assert_eq!(timer.update(5.0, t0), 0.0);
        assert!(timer.is_running());

        let at_one_second = timer.update(5.0, t0 + Duration::from_secs(1));
        assert_relative_eq!(at_one_second, 1.0, epsilon = 1e-6);

        assert_eq!(timer.update(0.0, t0 + Duration::from_millis(1500)), 0.0);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_is_monotonic_while_flowing() {
        let t0 = Instant::now();
        let mut timer = FillTimer::new();
        let mut last = timer.update(1.0, t0);
        for step in 1..50 {
            let now = t0 + Duration::from_millis(100 * step);
            let elapsed = timer.update(1.0, now);
            assert!(elapsed >= last);
            last = elapsed;
        }
        assert_relative_eq!(last, 4.9, epsilon = 1e-4);
    }

    #[test]
    fn test_restarts_from_zero_after_stop() {
        let t0 = Instant::now();
        let mut timer = FillTimer::new();

        timer.update(2.0, t0);
        timer.update(2.0, t0 + Duration::from_secs(10));
        timer.update(0.0, t0 + Duration::from_secs(11));

        assert_eq!(timer.update(2.0, t0 + Duration::from_secs(12)), 0.0);
        let elapsed = timer.update(2.0, t0 + Duration::from_secs(14));
        assert_relative_eq!(elapsed, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_clock_going_backwards_reports_zero() {
        let t0 = Instant::now() + Duration::from_secs(5);
        let mut timer = FillTimer::new();
        timer.update(3.0, t0);
        assert_eq!(timer.update(3.0, t0 - Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn test_negative_zero_stops_the_timer() {
        let t0 = Instant::now();
        let mut timer = FillTimer::new();
        timer.update(3.0, t0);
        assert_eq!(timer.update(-0.0, t0 + Duration::from_secs(1)), 0.0);
        assert!(!timer.is_running());
    }
}
