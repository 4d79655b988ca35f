//! Minimum, jittered spacing between requests to a single origin.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Serializes outbound requests so that consecutive request starts are, in
/// expectation, at least `min_interval` apart.
///
/// When a request comes in sooner than `min_interval` after the previous one,
/// the caller sleeps for a duration drawn uniformly from
/// `[0, 2 * (min_interval - elapsed))`. Individual gaps may be shorter than
/// the interval; only the mean is bounded.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until the next request may start, then record that it started now.
    pub async fn wait_then_mark(&self) {
        let delay = {
            let last = self
                .last_request
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match *last {
                Some(at) => jittered_delay(self.min_interval, at.elapsed(), rand::random::<f64>()),
                None => Duration::ZERO,
            }
        };

        if !delay.is_zero() {
            tracing::info!("Sleeping for {:.3} seconds before request", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }

        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }
}

/// Sleep needed before the next request, given a uniform sample in `[0, 1)`.
pub fn jittered_delay(min_interval: Duration, elapsed: Duration, sample: f64) -> Duration {
    if elapsed >= min_interval {
        return Duration::ZERO;
    }
    (min_interval - elapsed).mul_f64(2.0 * sample.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_delay_once_interval_elapsed() {
        let delay = jittered_delay(Duration::from_secs(5), Duration::from_secs(6), 0.9);
        assert_eq!(delay, Duration::ZERO);
    }

    #[test]
    fn test_delay_scales_with_remaining_interval() {
        let interval = Duration::from_secs(5);
        let elapsed = Duration::from_secs(1);

        assert_eq!(jittered_delay(interval, elapsed, 0.0), Duration::ZERO);
        assert_eq!(jittered_delay(interval, elapsed, 0.5), Duration::from_secs(4));
        assert_eq!(jittered_delay(interval, elapsed, 0.75), Duration::from_secs(6));
    }

    #[test]
    fn test_expected_delay_equals_remaining_interval() {
        let interval = Duration::from_millis(100);
        let elapsed = Duration::from_millis(40);
        let samples: u32 = 1000;
        let total: Duration = (0..samples)
            .map(|i| jittered_delay(interval, elapsed, i as f64 / samples as f64))
            .sum();
        let mean = total / samples;

        // Evenly spaced samples over [0, 1) average to just under 0.5.
        assert!(mean >= Duration::from_millis(59), "mean was {:?}", mean);
        assert!(mean <= Duration::from_millis(60), "mean was {:?}", mean);
    }

    #[tokio::test]
    async fn test_first_request_does_not_wait() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        let start = Instant::now();
        limiter.wait_then_mark().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_mean_spacing_meets_interval() {
        let interval = Duration::from_millis(20);
        let limiter = RateLimiter::new(interval);
        let rounds: u32 = 40;

        limiter.wait_then_mark().await;
        let start = Instant::now();
        for _ in 0..rounds {
            limiter.wait_then_mark().await;
        }
        let mean_gap = start.elapsed() / rounds;

        // The expectation is exactly the interval; leave room for sampling noise.
        assert!(
            mean_gap >= interval.mul_f64(0.6),
            "mean gap {:?} below interval {:?}",
            mean_gap,
            interval
        );
    }
}
