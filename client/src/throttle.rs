use std::time::Duration;

/// Decides which frame loop ticks take a brightness sample.
///
/// The first tick after `reset` always samples; after that a tick samples
/// only once strictly more than `interval` has passed since the last sample.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: f64,
    /// timestamp of the last sample, `None` until the first one
    last: Option<f64>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_secs_f64() * 1000.0,
            last: None,
        }
    }

    /// Check a tick at `now_ms` and record it as the last sample if it is due
    pub fn should_sample(&mut self, now_ms: f64) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now_ms - last > self.interval_ms,
        };

        if due {
            self.last = Some(now_ms);
        }
        due
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last_sample(&self) -> Option<f64> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampled(interval_ms: u64, ticks: &[f64]) -> Vec<f64> {
        let mut throttle = Throttle::new(Duration::from_millis(interval_ms));
        ticks
            .iter()
            .copied()
            .filter(|&t| throttle.should_sample(t))
            .collect()
    }

    #[test]
    fn samples_first_tick_then_after_interval() {
        assert_eq!(
            sampled(400, &[0.0, 100.0, 450.0, 460.0, 900.0]),
            vec![0.0, 450.0, 900.0]
        );
    }

    #[test]
    fn exactly_one_interval_is_not_enough() {
        assert_eq!(sampled(400, &[0.0, 400.0, 400.5]), vec![0.0, 400.5]);
    }

    #[test]
    fn first_tick_samples_even_at_time_zero() {
        assert_eq!(sampled(400, &[0.0]), vec![0.0]);
    }

    #[test]
    fn reset_makes_next_tick_sample() {
        let mut throttle = Throttle::new(Duration::from_millis(400));
        assert!(throttle.should_sample(1000.0));
        assert!(!throttle.should_sample(1100.0));

        throttle.reset();
        assert_eq!(throttle.last_sample(), None);
        assert!(throttle.should_sample(1150.0));
    }
}
