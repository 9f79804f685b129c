//! Cooldown after server-signalled throttling.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use strum::IntoEnumIterator;
use tokio::time::Instant;

use crate::config::{CRITICAL_FLOOD_WAIT_SECS, FAR_FUTURE};
use crate::models::QuotaCategory;

/// One "wait N seconds" signal from the platform.
///
/// Only folded into running totals; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleEvent {
    /// When the signal was received.
    pub timestamp: DateTime<Utc>,
    /// Seconds the platform asked us to wait.
    pub wait_seconds: u64,
    /// Category of the call that was throttled.
    pub operation_category: QuotaCategory,
}

/// Account-wide cooldown state.
///
/// Throttling is treated as applying to the whole account, so a signal on any
/// category blocks admission for all of them until the deadline passes.
#[derive(Debug, Clone)]
pub struct CooldownController {
    deadline: Option<Instant>,
    flood_waits: u64,
    wait_seconds_total: u64,
    by_category: HashMap<QuotaCategory, u64>,
}

impl Default for CooldownController {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownController {
    /// Creates a controller with no active cooldown.
    pub fn new() -> Self {
        CooldownController {
            deadline: None,
            flood_waits: 0,
            wait_seconds_total: 0,
            by_category: QuotaCategory::iter().map(|c| (c, 0)).collect(),
        }
    }

    /// Records a throttle event and arms the cooldown.
    ///
    /// The deadline only ever moves later: a short signal during a longer
    /// cooldown does not shorten it. Returns the resulting deadline.
    pub fn on_throttled(&mut self, event: ThrottleEvent, now: Instant) -> Instant {
        self.flood_waits += 1;
        self.wait_seconds_total = self.wait_seconds_total.saturating_add(event.wait_seconds);
        *self.by_category.entry(event.operation_category).or_insert(0) += 1;

        if event.wait_seconds > CRITICAL_FLOOD_WAIT_SECS {
            log::error!(
                "CRITICAL: flood wait of {}s on {} call, account may be at risk",
                event.wait_seconds,
                event.operation_category
            );
        } else {
            log::warn!(
                "Flood wait #{} for {}s on {} call",
                self.flood_waits,
                event.wait_seconds,
                event.operation_category
            );
        }

        let wait = Duration::from_secs(event.wait_seconds);
        let candidate = now
            .checked_add(wait)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        let deadline = match self.deadline {
            Some(current) if current > candidate => current,
            _ => candidate,
        };
        self.deadline = Some(deadline);
        deadline
    }

    /// Deadline of the active cooldown, if one is still running at `now`.
    pub fn active_deadline(&self, now: Instant) -> Option<Instant> {
        self.deadline.filter(|deadline| *deadline > now)
    }

    /// Time left in the active cooldown.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.active_deadline(now)
            .map(|deadline| deadline - now)
            .unwrap_or(Duration::ZERO)
    }

    /// Total throttle events.
    pub fn flood_waits(&self) -> u64 {
        self.flood_waits
    }

    /// Sum of all requested wait times, in seconds.
    pub fn wait_seconds_total(&self) -> u64 {
        self.wait_seconds_total
    }

    /// Throttle events for one category.
    pub fn flood_waits_for(&self, category: QuotaCategory) -> u64 {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    /// Adds totals carried over from an earlier run to the running ones.
    ///
    /// Per-category counts and the deadline are not restored.
    pub fn restore_totals(&mut self, flood_waits: u64, wait_seconds_total: u64) {
        self.flood_waits = self.flood_waits.saturating_add(flood_waits);
        self.wait_seconds_total = self.wait_seconds_total.saturating_add(wait_seconds_total);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn event(wait_seconds: u64, operation_category: QuotaCategory) -> ThrottleEvent {
        ThrottleEvent {
            timestamp: Utc::now(),
            wait_seconds,
            operation_category,
        }
    }

    #[test]
    fn test_no_cooldown_initially() {
        let cooldown = CooldownController::new();
        let now = Instant::now();
        assert_eq!(cooldown.active_deadline(now), None);
        assert_eq!(cooldown.remaining(now), Duration::ZERO);
        assert_eq!(cooldown.flood_waits(), 0);
    }

    #[test]
    fn test_on_throttled_sets_deadline() {
        let mut cooldown = CooldownController::new();
        let now = Instant::now();
        let deadline = cooldown.on_throttled(event(30, QuotaCategory::Api), now);
        assert_eq!(deadline, now + Duration::from_secs(30));
        assert_eq!(cooldown.remaining(now + Duration::from_secs(10)), Duration::from_secs(20));
        assert_eq!(cooldown.active_deadline(now + Duration::from_secs(30)), None);
    }

    #[test]
    fn test_shorter_signal_keeps_longer_deadline() {
        let mut cooldown = CooldownController::new();
        let now = Instant::now();
        cooldown.on_throttled(event(60, QuotaCategory::Dm), now);
        let deadline = cooldown.on_throttled(event(5, QuotaCategory::Api), now);
        assert_eq!(deadline, now + Duration::from_secs(60));
    }

    #[test]
    fn test_totals_and_per_category_counts() {
        let mut cooldown = CooldownController::new();
        let now = Instant::now();
        cooldown.on_throttled(event(10, QuotaCategory::Api), now);
        cooldown.on_throttled(event(20, QuotaCategory::Api), now);
        cooldown.on_throttled(event(700, QuotaCategory::JoinLeave), now);
        assert_eq!(cooldown.flood_waits(), 3);
        assert_eq!(cooldown.wait_seconds_total(), 730);
        assert_eq!(cooldown.flood_waits_for(QuotaCategory::Api), 2);
        assert_eq!(cooldown.flood_waits_for(QuotaCategory::Dm), 0);
        assert_eq!(cooldown.flood_waits_for(QuotaCategory::JoinLeave), 1);
    }

    #[test]
    fn test_overflowing_wait_is_measured_from_given_now() {
        let mut cooldown = CooldownController::new();
        let later = Instant::now() + Duration::from_secs(2 * 365 * 24 * 3600);
        let deadline = cooldown.on_throttled(event(u64::MAX, QuotaCategory::Api), later);
        assert_eq!(deadline, later + FAR_FUTURE);
        assert_eq!(cooldown.remaining(later), FAR_FUTURE);
        assert_eq!(cooldown.wait_seconds_total(), u64::MAX);
    }

    #[test]
    fn test_zero_second_signal_does_not_block() {
        let mut cooldown = CooldownController::new();
        let now = Instant::now();
        cooldown.on_throttled(event(0, QuotaCategory::Api), now);
        assert_eq!(cooldown.active_deadline(now), None);
        assert_eq!(cooldown.flood_waits(), 1);
    }

    #[test]
    fn test_restored_totals_add_up_without_arming() {
        let mut cooldown = CooldownController::new();
        cooldown.restore_totals(3, 90);
        let now = Instant::now();
        assert_eq!(cooldown.active_deadline(now), None);
        assert_eq!(cooldown.flood_waits_for(QuotaCategory::Dm), 0);

        cooldown.on_throttled(event(10, QuotaCategory::Dm), now);
        assert_eq!(cooldown.flood_waits(), 4);
        assert_eq!(cooldown.wait_seconds_total(), 100);
        assert_eq!(cooldown.flood_waits_for(QuotaCategory::Dm), 1);
    }
}
