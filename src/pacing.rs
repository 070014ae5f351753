//! Speed-bump controller
//!
//! The venue allows a fixed number of order submissions per second. Rather
//! than sleeping a constant interval, we track a moving average of observed
//! submission round-trip times and sleep only the remainder: the slower the
//! venue responds, the less additional delay is needed.

use std::collections::VecDeque;
use std::time::Duration;

/// Samples kept in the round-trip moving window.
pub const MOVING_AVERAGE_WINDOW: usize = 10;

/// Local rate governor for order submission.
#[derive(Debug, Clone)]
pub struct SpeedBump {
    round_trips: VecDeque<f64>,
    /// Maximum submissions per second allowed by the venue.
    order_rate: f64,
    /// Floor on the computed delay (seconds).
    min_delay: f64,
}

impl SpeedBump {
    pub fn new(order_rate: f64, min_delay: f64) -> Self {
        Self {
            round_trips: VecDeque::with_capacity(MOVING_AVERAGE_WINDOW),
            order_rate: order_rate.max(f64::MIN_POSITIVE),
            min_delay: min_delay.max(0.0),
        }
    }

    /// Record one observed submission round-trip (seconds).
    pub fn record(&mut self, round_trip_secs: f64) {
        if self.round_trips.len() >= MOVING_AVERAGE_WINDOW {
            self.round_trips.pop_front();
        }
        self.round_trips.push_back(round_trip_secs.max(0.0));
    }

    /// Delay to insert before the next submission.
    ///
    /// `max(1/rate − moving_average, min_delay)`: the required inter-order
    /// spacing minus the time the last submissions already took.
    pub fn required_delay(&self) -> Duration {
        let avg = if self.round_trips.is_empty() {
            0.0
        } else {
            self.round_trips.iter().sum::<f64>() / self.round_trips.len() as f64
        };
        let required = 1.0 / self.order_rate;
        Duration::from_secs_f64((required - avg).max(self.min_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_requires_the_full_interval() {
        let bump = SpeedBump::new(10.0, 0.01);
        assert!((bump.required_delay().as_secs_f64() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn slow_round_trips_shrink_the_delay_to_the_floor() {
        let mut bump = SpeedBump::new(10.0, 0.01);
        for _ in 0..MOVING_AVERAGE_WINDOW {
            bump.record(0.5);
        }
        assert!((bump.required_delay().as_secs_f64() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn window_is_bounded() {
        let mut bump = SpeedBump::new(10.0, 0.01);
        // Saturate with slow samples, then push fast ones; once the slow
        // samples have been evicted the delay returns near the full interval.
        for _ in 0..MOVING_AVERAGE_WINDOW {
            bump.record(1.0);
        }
        for _ in 0..MOVING_AVERAGE_WINDOW {
            bump.record(0.0);
        }
        assert!((bump.required_delay().as_secs_f64() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn partial_window_averages_what_it_has() {
        let mut bump = SpeedBump::new(10.0, 0.01);
        bump.record(0.02);
        bump.record(0.04);
        // avg 0.03, required 0.1 - 0.03 = 0.07
        assert!((bump.required_delay().as_secs_f64() - 0.07).abs() < 1e-9);
    }
}
