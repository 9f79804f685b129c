//! Warmup ramp for fresh accounts.
//!
//! The gate asks the warmup for a rate factor before every admission and feeds
//! `max_rate * factor` into the token bucket. The shape of the ramp is a policy
//! decision, so it is supplied as a curve.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Smallest factor a curve can produce; keeps the bucket rate positive.
const MIN_FACTOR: f64 = 0.01;

/// Maps warmup progress (0.0 at start, 1.0 at the end) to a rate factor.
pub type WarmupCurve = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Time-scaled rate ramp.
#[derive(Clone)]
pub struct Warmup {
    started_at: Instant,
    period: Duration,
    curve: WarmupCurve,
}

impl fmt::Debug for Warmup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Warmup")
            .field("started_at", &self.started_at)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl Warmup {
    /// Ramp following an arbitrary `curve`.
    pub fn new(started_at: Instant, period: Duration, curve: WarmupCurve) -> Self {
        Warmup {
            started_at,
            period,
            curve,
        }
    }

    /// Straight line from `floor` at the start to 1.0 at the end of `period`.
    pub fn linear(started_at: Instant, period: Duration, floor: f64) -> Self {
        let floor = floor.clamp(MIN_FACTOR, 1.0);
        Self::new(
            started_at,
            period,
            Arc::new(move |progress| floor + (1.0 - floor) * progress),
        )
    }

    /// Rate factor in `[MIN_FACTOR, 1.0]` at `now`.
    pub fn factor(&self, now: Instant) -> f64 {
        if self.is_complete(now) {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        let progress = elapsed.as_secs_f64() / self.period.as_secs_f64();
        let factor = (self.curve)(progress);
        if factor.is_finite() {
            factor.clamp(MIN_FACTOR, 1.0)
        } else {
            1.0
        }
    }

    /// `max_rate` scaled by the current factor.
    pub fn effective_rate(&self, max_rate: f64, now: Instant) -> f64 {
        max_rate * self.factor(now)
    }

    /// Whether the ramp has finished.
    pub fn is_complete(&self, now: Instant) -> bool {
        self.period.is_zero() || now.saturating_duration_since(self.started_at) >= self.period
    }
}
