//! Daily quota counters per operation category.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::config::QuotaWindow;
use crate::models::QuotaCategory;

/// Counter for one category within its current day window.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaCounter {
    /// Category this counter belongs to.
    pub category: QuotaCategory,
    /// Units reserved in the current window.
    pub count_today: u32,
    /// When the current window was opened.
    pub day_window_start: DateTime<Utc>,
    /// Cap per window, `None` when uncapped.
    pub daily_cap: Option<u32>,
}

/// Usage report for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    /// Units used in the current window.
    pub used: u32,
    /// Cap per window, `None` when uncapped.
    pub cap: Option<u32>,
}

/// Reservation refused because it would exceed the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaRejection {
    /// Units already used in the current window.
    pub used: u32,
    /// Configured cap.
    pub cap: u32,
}

/// Tracks per-category daily caps.
///
/// Admission is refused up front; a counter never goes above its cap.
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    counters: HashMap<QuotaCategory, QuotaCounter>,
    window: QuotaWindow,
}

impl QuotaTracker {
    /// Creates empty counters for every category.
    ///
    /// `caps` maps each category to its daily cap (`None` = uncapped).
    pub fn new<F>(caps: F, window: QuotaWindow, now: DateTime<Utc>) -> Self
    where
        F: Fn(QuotaCategory) -> Option<u32>,
    {
        let mut counters = HashMap::new();
        for category in QuotaCategory::iter() {
            counters.insert(
                category,
                QuotaCounter {
                    category,
                    count_today: 0,
                    day_window_start: now,
                    daily_cap: caps(category),
                },
            );
        }
        QuotaTracker { counters, window }
    }

    /// Reserves `weight` units for `category`.
    ///
    /// Rolls the window over first if it has expired. Weight 0 always succeeds
    /// and changes nothing.
    pub fn reserve(
        &mut self,
        category: QuotaCategory,
        weight: u32,
        now: DateTime<Utc>,
    ) -> Result<QuotaUsage, QuotaRejection> {
        let window = self.window;
        let counter = self.counter_mut(category);
        if window_expired(window, counter.day_window_start, now) {
            log::info!(
                "New {} quota window (previous window used {})",
                category,
                counter.count_today
            );
            counter.count_today = 0;
            counter.day_window_start = now;
        }

        if let Some(cap) = counter.daily_cap {
            if counter.count_today.saturating_add(weight) > cap {
                return Err(QuotaRejection {
                    used: counter.count_today,
                    cap,
                });
            }
        }

        counter.count_today = counter.count_today.saturating_add(weight);
        Ok(QuotaUsage {
            used: counter.count_today,
            cap: counter.daily_cap,
        })
    }

    /// Usage as of `now`, without rolling the window.
    pub fn usage(&self, category: QuotaCategory, now: DateTime<Utc>) -> QuotaUsage {
        let Some(counter) = self.counters.get(&category) else {
            return QuotaUsage { used: 0, cap: None };
        };
        let used = if window_expired(self.window, counter.day_window_start, now) {
            0
        } else {
            counter.count_today
        };
        QuotaUsage {
            used,
            cap: counter.daily_cap,
        }
    }

    /// Restores a persisted counter. Expired windows are ignored and counts
    /// above the current cap are clamped to it.
    pub fn restore(
        &mut self,
        category: QuotaCategory,
        count_today: u32,
        day_window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        if window_expired(self.window, day_window_start, now) {
            log::debug!("Ignoring stale {} counter from {}", category, day_window_start);
            return;
        }
        let counter = self.counter_mut(category);
        let count_today = match counter.daily_cap {
            Some(cap) if count_today > cap => {
                log::warn!(
                    "Restored {} counter {} is above the current cap {}, clamping",
                    category,
                    count_today,
                    cap
                );
                cap
            }
            _ => count_today,
        };
        counter.count_today = count_today;
        counter.day_window_start = day_window_start;
    }

    /// All counters, ordered by category.
    pub fn counters(&self) -> Vec<QuotaCounter> {
        let mut counters: Vec<_> = self.counters.values().cloned().collect();
        counters.sort_by_key(|c| c.category);
        counters
    }

    fn counter_mut(&mut self, category: QuotaCategory) -> &mut QuotaCounter {
        // Every category is inserted in `new`.
        self.counters
            .entry(category)
            .or_insert_with(|| QuotaCounter {
                category,
                count_today: 0,
                day_window_start: DateTime::<Utc>::MIN_UTC,
                daily_cap: None,
            })
    }
}

/// Whether a window opened at `start` is over at `now`.
fn window_expired(window: QuotaWindow, start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match window {
        QuotaWindow::Calendar => now.date_naive() > start.date_naive(),
        QuotaWindow::Rolling => now - start >= chrono::Duration::hours(24),
    }
}
