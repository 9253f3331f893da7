//! Sliding-window rate estimation for the serial worker's stats line.

use std::time::{Duration, Instant};

pub const BUCKET_COUNT: usize = 32;
pub const BUCKET_DURATION: Duration = Duration::from_millis(200);

/// Counts events into 200 ms buckets over a ~6.4 s window.
#[derive(Debug)]
pub struct RateEstimator {
    buckets: [u64; BUCKET_COUNT],
    current: usize,
    bucket_start: Instant,
}

impl RateEstimator {
    pub fn new() -> Self {
        Self::with_start(Instant::now())
    }

    fn with_start(now: Instant) -> Self {
        Self {
            buckets: [0; BUCKET_COUNT],
            current: 0,
            bucket_start: now,
        }
    }

    pub fn record(&mut self, count: u64) {
        self.record_at(count, Instant::now());
    }

    pub fn record_at(&mut self, count: u64, now: Instant) {
        self.advance(now);
        self.buckets[self.current] += count;
    }

    pub fn rate_per_second(&mut self) -> f64 {
        self.rate_per_second_at(Instant::now())
    }

    pub fn rate_per_second_at(&mut self, now: Instant) -> f64 {
        self.advance(now);
        let total: u64 = self.buckets.iter().sum();
        total as f64 / (BUCKET_COUNT as f64 * BUCKET_DURATION.as_secs_f64())
    }

    /// Rotate forward, zeroing buckets that elapsed without any events.
    fn advance(&mut self, now: Instant) {
        let mut elapsed = now.saturating_duration_since(self.bucket_start);
        if elapsed < BUCKET_DURATION {
            return;
        }
        let steps = (elapsed.as_millis() / BUCKET_DURATION.as_millis()) as usize;
        for _ in 0..steps.min(BUCKET_COUNT) {
            self.current = (self.current + 1) % BUCKET_COUNT;
            self.buckets[self.current] = 0;
        }
        if steps >= BUCKET_COUNT {
            self.buckets = [0; BUCKET_COUNT];
        }
        while elapsed >= BUCKET_DURATION {
            self.bucket_start += BUCKET_DURATION;
            elapsed -= BUCKET_DURATION;
        }
    }
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_stream_converges_to_true_rate() {
        let start = Instant::now();
        let mut est = RateEstimator::with_start(start);
        // 100 events per bucket for a full window = 500 events/s.
        for i in 0..BUCKET_COUNT as u64 {
            est.record_at(100, start + BUCKET_DURATION * (i as u32));
        }
        let rate = est.rate_per_second_at(start + BUCKET_DURATION * (BUCKET_COUNT as u32 - 1));
        assert!((rate - 500.0).abs() < 25.0, "rate was {rate}");
    }

    #[test]
    fn idle_window_decays_to_zero() {
        let start = Instant::now();
        let mut est = RateEstimator::with_start(start);
        est.record_at(1_000, start);
        let rate = est.rate_per_second_at(start + BUCKET_DURATION * (BUCKET_COUNT as u32 * 2));
        assert_eq!(rate, 0.0);
    }
}
