//! Tick-rate estimation from successive timestamps.

/// Instantaneous rate of whatever periodic event calls
/// [`record_tick`](Self::record_tick).
///
/// Driven by the sampling tick, this measures the tick cadence itself, not a
/// rendering frame rate.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    last_tick: f64,
    rate: u32,
}

impl RateEstimator {
    pub fn new(start: f64) -> Self {
        Self {
            last_tick: start,
            rate: 0,
        }
    }

    /// Record a tick at `now` (seconds) and return the current rate.
    ///
    /// A non-positive interval leaves the rate unchanged. `now` always
    /// becomes the reference for the next call.
    pub fn record_tick(&mut self, now: f64) -> u32 {
        let delta = now - self.last_tick;
        if delta > 0.0 {
            self.rate = (1.0 / delta).round() as u32;
        }
        self.last_tick = now;
        self.rate
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn last_tick(&self) -> f64 {
        self.last_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_second_ticks_are_one_hz() {
        let mut r = RateEstimator::new(0.0);
        assert_eq!(r.record_tick(1.0), 1);
        assert_eq!(r.record_tick(2.0), 1);
    }

    #[test]
    fn stall_keeps_previous_rate() {
        let mut r = RateEstimator::new(0.5);
        let rates: Vec<u32> = [1.0, 2.0, 2.0, 3.0]
            .iter()
            .map(|&t| r.record_tick(t))
            .collect();
        assert_eq!(rates, vec![2, 1, 1, 1]);
        assert_eq!(r.last_tick(), 3.0);
    }

    #[test]
    fn backwards_clock_updates_reference() {
        let mut r = RateEstimator::new(10.0);
        assert_eq!(r.record_tick(10.5), 2);
        assert_eq!(r.record_tick(9.0), 2);
        assert_eq!(r.last_tick(), 9.0);
        // Measured from the rewound reference, not from 10.5.
        assert_eq!(r.record_tick(9.25), 4);
    }

    #[test]
    fn rounds_to_nearest() {
        let mut r = RateEstimator::new(0.0);
        assert_eq!(r.record_tick(1.0 / 59.6), 60);
        assert_eq!(r.rate(), 60);
    }
}
