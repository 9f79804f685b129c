//! Token bucket governing the steady-state request rate.

use std::time::Duration;
use tokio::time::Instant;

/// Token bucket with continuous refill.
///
/// Tokens accumulate at `rate` per second up to `capacity`. Refill is computed
/// from the time elapsed since the previous refill, so there is no ticker task
/// and no drift.
///
/// # Invariant
///
/// `0 <= tokens <= capacity` after every operation.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket.
    pub fn new(rate: f64, capacity: f64, now: Instant) -> Self {
        TokenBucket {
            capacity,
            rate,
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Adds `elapsed * rate` tokens, capped at capacity.
    pub fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.rate).min(self.capacity);
        self.last_refill = now.max(self.last_refill);
    }

    /// Takes one token if available.
    ///
    /// On failure, returns how long until a token will be available at the
    /// current rate.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(self.wait_time())
        }
    }

    /// Time until one token is available, without consuming anything.
    pub fn wait_time(&self) -> Duration {
        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }
        // Round up to the next nanosecond so the wait never falls short.
        let secs = (1.0 - self.tokens) / self.rate;
        Duration::try_from_secs_f64(secs)
            .map(|wait| wait.saturating_add(Duration::from_nanos(1)))
            .unwrap_or(Duration::MAX)
    }

    /// Changes the refill rate.
    ///
    /// Tokens earned so far are credited at the old rate first.
    pub fn update_rps(&mut self, rate: f64, now: Instant) {
        self.refill(now);
        self.rate = rate;
    }

    /// Current refill rate in tokens per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Maximum number of stored tokens.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Tokens available as of the last refill.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bucket_is_full() {
        let now = Instant::now();
        let bucket = TokenBucket::new(4.0, 4.0, now);
        assert_eq!(bucket.tokens(), 4.0);
        assert_eq!(bucket.wait_time(), Duration::ZERO);
    }

    #[test]
    fn test_burst_then_wait() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(4.0, 4.0, now);
        for _ in 0..4 {
            assert!(bucket.try_acquire(now).is_ok());
        }
        let wait = bucket.try_acquire(now).unwrap_err();
        assert!(wait >= Duration::from_millis(250));
        assert!(wait < Duration::from_millis(251));
    }

    #[test]
    fn test_refill_is_proportional_to_elapsed_time() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(4.0, 4.0, now);
        for _ in 0..4 {
            bucket.try_acquire(now).unwrap();
        }
        bucket.refill(now + Duration::from_millis(500));
        assert!((bucket.tokens() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_refill_caps_at_capacity() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(4.0, 4.0, now);
        bucket.try_acquire(now).unwrap();
        bucket.refill(now + Duration::from_secs(3600));
        assert_eq!(bucket.tokens(), 4.0);
    }

    #[test]
    fn test_refill_ignores_time_going_backwards() {
        let now = Instant::now() + Duration::from_secs(10);
        let mut bucket = TokenBucket::new(4.0, 4.0, now);
        bucket.try_acquire(now).unwrap();
        bucket.refill(now - Duration::from_secs(5));
        assert_eq!(bucket.tokens(), 3.0);
    }

    #[test]
    fn test_update_rps_changes_refill_speed() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(1.0, 2.0, now);
        bucket.try_acquire(now).unwrap();
        bucket.try_acquire(now).unwrap();
        bucket.update_rps(10.0, now);
        assert_eq!(bucket.rate(), 10.0);
        bucket.refill(now + Duration::from_millis(100));
        assert!((bucket.tokens() - 1.0).abs() < 1e-9);
    }
}
