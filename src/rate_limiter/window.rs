//! Sliding window of recent admissions.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Sliding window over admission timestamps, used to measure the observed rate.
#[derive(Debug, Clone)]
pub(crate) struct AdmissionWindow {
    admissions: VecDeque<Instant>,
    window_size: usize,
    window_duration: Duration,
}

impl AdmissionWindow {
    pub(crate) fn new(window_size: usize, window_duration: Duration) -> Self {
        AdmissionWindow {
            admissions: VecDeque::with_capacity(window_size.min(64)),
            window_size,
            window_duration,
        }
    }

    /// Records an admission.
    pub(crate) fn record(&mut self, now: Instant) {
        // Remove old entries outside the time window
        while let Some(front) = self.admissions.front() {
            if now.saturating_duration_since(*front) >= self.window_duration {
                self.admissions.pop_front();
            } else {
                break;
            }
        }

        self.admissions.push_back(now);

        // Trim to max size if needed
        while self.admissions.len() > self.window_size {
            self.admissions.pop_front();
        }
    }

    /// Admissions within the trailing window ending at `now`.
    pub(crate) fn count(&self, now: Instant) -> usize {
        self.admissions
            .iter()
            .filter(|time| now.saturating_duration_since(**time) < self.window_duration)
            .count()
    }

    /// Observed admissions per second over the trailing window.
    pub(crate) fn rate(&self, now: Instant) -> f64 {
        self.count(now) as f64 / self.window_duration.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window() {
        let window = AdmissionWindow::new(100, Duration::from_secs(1));
        let now = Instant::now();
        assert_eq!(window.count(now), 0);
        assert_eq!(window.rate(now), 0.0);
    }

    #[test]
    fn test_rate_counts_trailing_second() {
        let mut window = AdmissionWindow::new(100, Duration::from_secs(1));
        let start = Instant::now();
        for i in 0..4 {
            window.record(start + Duration::from_millis(250 * i));
        }
        let now = start + Duration::from_millis(750);
        assert_eq!(window.count(now), 4);
        assert_eq!(window.rate(now), 4.0);
    }

    #[test]
    fn test_old_entries_expire() {
        let mut window = AdmissionWindow::new(100, Duration::from_secs(1));
        let start = Instant::now();
        window.record(start);
        window.record(start + Duration::from_millis(500));

        // Read-only queries do not prune, they just filter.
        assert_eq!(window.count(start + Duration::from_millis(1200)), 1);
        assert_eq!(window.count(start + Duration::from_secs(2)), 0);

        window.record(start + Duration::from_secs(2));
        assert_eq!(window.admissions.len(), 1);
    }

    #[test]
    fn test_size_limit() {
        let mut window = AdmissionWindow::new(5, Duration::from_secs(1));
        let now = Instant::now();
        for _ in 0..10 {
            window.record(now);
        }
        assert_eq!(window.count(now), 5);
    }
}
