//! Call statistics.
//!
//! Counters are atomics so they can be bumped without taking the gate's state
//! lock. [`StatsSnapshot`] is the read-only value handed to callers.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use strum::IntoEnumIterator;

use crate::models::QuotaCategory;
use crate::rate_limiter::QuotaUsage;

/// Thread-safe call counters, one set per category.
pub struct CallStats {
    successes: HashMap<QuotaCategory, AtomicU64>,
    quota_rejections: HashMap<QuotaCategory, AtomicU64>,
    // Successes counted by an earlier run on the same day.
    carried_over: AtomicU64,
}

impl Default for CallStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStats {
    /// All counters start at zero.
    pub fn new() -> Self {
        let mut successes = HashMap::new();
        let mut quota_rejections = HashMap::new();
        for category in QuotaCategory::iter() {
            successes.insert(category, AtomicU64::new(0));
            quota_rejections.insert(category, AtomicU64::new(0));
        }
        CallStats {
            successes,
            quota_rejections,
            carried_over: AtomicU64::new(0),
        }
    }

    /// Adds successes counted by an earlier run to [`Self::api_calls`].
    ///
    /// Per-category counts start from zero regardless.
    pub fn carry_over(&self, api_calls: u64) {
        self.carried_over.fetch_add(api_calls, Ordering::Relaxed);
    }

    /// Counts a successful call; returns the new total across categories.
    pub fn record_success(&self, category: QuotaCategory) -> u64 {
        if let Some(counter) = self.successes.get(&category) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        self.api_calls()
    }

    /// Counts a reservation refused by the quota tracker.
    pub fn record_quota_rejection(&self, category: QuotaCategory) {
        if let Some(counter) = self.quota_rejections.get(&category) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Successful calls across all categories, including any carried over.
    pub fn api_calls(&self) -> u64 {
        self.successes
            .values()
            .map(|c| c.load(Ordering::SeqCst))
            .sum::<u64>()
            + self.carried_over.load(Ordering::SeqCst)
    }

    /// Successful calls for one category.
    pub fn successes_for(&self, category: QuotaCategory) -> u64 {
        self.successes
            .get(&category)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Refused reservations across all categories.
    pub fn quota_rejections(&self) -> u64 {
        self.quota_rejections
            .values()
            .map(|c| c.load(Ordering::SeqCst))
            .sum()
    }
}

/// Per-category figures in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    /// Successful calls.
    pub calls: u64,
    /// Throttle events on calls of this category.
    pub flood_waits: u64,
    /// Quota usage in the current day window.
    pub quota: QuotaUsage,
}

/// Point-in-time view of the limiter, computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Successful calls across all categories.
    pub api_calls: u64,
    /// Throttle events received from the platform.
    pub flood_waits: u64,
    /// Admissions per second over the trailing second.
    pub current_rps: f64,
    /// Rate the bucket is currently refilling at (below the configured rate
    /// during warmup).
    pub effective_max_rps: f64,
    /// Sum of all flood-wait durations, in seconds.
    pub flood_wait_seconds_total: u64,
    /// Seconds left in the active cooldown.
    pub cooldown_remaining_secs: f64,
    /// Calls refused because a daily cap was reached.
    pub quota_rejections: u64,
    /// Breakdown by category.
    pub categories: BTreeMap<QuotaCategory, CategoryStats>,
}
