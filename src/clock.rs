//! Time source abstraction.
//!
//! Every wait inside the limiter goes through a [`Clock`], so tests can swap the
//! real tokio clock for a [`ManualClock`] that jumps straight to each deadline.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, FutureExt};
use tokio::time::Instant;

/// Wall-clock time and suspendable delay.
pub trait Clock: Send + Sync {
    /// Monotonic "now", used for token refill, cooldown deadlines and windows.
    fn now(&self) -> Instant;

    /// Calendar time, used for quota day windows.
    fn wall_now(&self) -> DateTime<Utc>;

    /// Suspends the calling task until `deadline`.
    fn sleep_until(&self, deadline: Instant) -> BoxFuture<'static, ()>;

    /// Suspends the calling task for `duration`.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.sleep_until(self.now() + duration)
    }
}

/// Real time, backed by tokio.
///
/// Because it uses `tokio::time`, it also follows tokio's paused clock in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep_until(&self, deadline: Instant) -> BoxFuture<'static, ()> {
        tokio::time::sleep_until(deadline).boxed()
    }
}

struct ManualState {
    offset: Duration,
    sleeps: usize,
}

/// Deterministic clock for tests.
///
/// Sleeping never blocks: `sleep_until` moves the clock forward to the deadline
/// (if it lies in the future) and resolves immediately. Monotonic and wall time
/// advance together.
pub struct ManualClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
    state: Mutex<ManualState>,
}

impl ManualClock {
    /// Creates a clock whose wall time starts at `wall_origin`.
    pub fn new(wall_origin: DateTime<Utc>) -> Self {
        ManualClock {
            origin: Instant::now(),
            wall_origin,
            state: Mutex::new(ManualState {
                offset: Duration::ZERO,
                sleeps: 0,
            }),
        }
    }

    /// Moves time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.offset += duration;
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.lock().offset
    }

    /// Number of sleeps that actually moved the clock.
    pub fn sleep_count(&self) -> usize {
        self.lock().sleeps
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        // A panic while holding this lock can only come from a test assertion.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.lock().offset
    }

    fn wall_now(&self) -> DateTime<Utc> {
        let offset = self.lock().offset;
        self.wall_origin + chrono::Duration::from_std(offset).unwrap_or(chrono::Duration::MAX)
    }

    fn sleep_until(&self, deadline: Instant) -> BoxFuture<'static, ()> {
        let mut state = self.lock();
        let target = deadline.saturating_duration_since(self.origin);
        if target > state.offset {
            state.offset = target;
            state.sleeps += 1;
        }
        future::ready(()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_advances_time() {
        let clock = clock();
        let start = clock.now();
        clock.sleep(Duration::from_millis(250)).await;
        assert_eq!(clock.now() - start, Duration::from_millis(250));
        assert_eq!(clock.sleep_count(), 1);
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_in_past_is_noop() {
        let clock = clock();
        let past = clock.now();
        clock.advance(Duration::from_secs(5));
        clock.sleep_until(past).await;
        assert_eq!(clock.elapsed(), Duration::from_secs(5));
        assert_eq!(clock.sleep_count(), 0);
    }

    #[test]
    fn test_manual_clock_wall_time_follows_monotonic() {
        let clock = clock();
        clock.advance(Duration::from_secs(13 * 3600));
        assert_eq!(
            clock.wall_now(),
            Utc.with_ymd_and_hms(2024, 3, 2, 1, 0, 0).unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_clock_follows_paused_tokio_time() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep(Duration::from_secs(30)).await;
        assert!(clock.now() - start >= Duration::from_secs(30));
    }
}
