//! Admission gate: the single entry point for remote calls.
//!
//! Every call to the remote platform goes through [`AdmissionGate::safe_call`]
//! (or one of its variants). Before the operation runs, the gate:
//! 1. waits out any active flood-wait cooldown (account-wide),
//! 2. takes a token from the bucket, waiting if the bucket is empty,
//! 3. reserves daily quota for the call's category, refusing if the cap is hit.
//!
//! Steps 2 and 3 happen under one lock, so concurrent callers never interleave
//! between taking a token and reserving quota. The lock is never held while
//! sleeping or writing the counter file. A token taken for a call that is then
//! refused by the quota stays spent.

mod call;
mod retry;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use strum::IntoEnumIterator;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::clock::Clock;
use crate::config::{Config, RATE_MEASUREMENT_WINDOW, RATE_WINDOW_MAX_ENTRIES};
use crate::error_handling::ConfigError;
use crate::models::QuotaCategory;
use crate::pacer::Pacer;
use crate::rate_limiter::{
    AdmissionWindow, CooldownController, QuotaTracker, QuotaUsage, ThrottleEvent, TokenBucket,
    Warmup,
};
use crate::stats::{CallStats, CategoryStats, StatsSnapshot};
use crate::storage::{CounterFile, StoredCounters, StoredTotals};

/// Limiter state, guarded as a unit.
struct LimiterState {
    max_rate: f64,
    bucket: TokenBucket,
    quotas: QuotaTracker,
    cooldown: CooldownController,
    window: AdmissionWindow,
    save_seq: u64,
}

/// Counter file contents captured under the state lock.
pub(super) struct PendingSave {
    seq: u64,
    contents: StoredCounters,
}

/// Rate, quota and cooldown enforcement for one remote account.
///
/// Create one per process and share it (`Arc<AdmissionGate>`) with every task
/// that talks to the platform.
pub struct AdmissionGate {
    state: Mutex<LimiterState>,
    stats: CallStats,
    pacer: Pacer,
    clock: Arc<dyn Clock>,
    warmup: Option<Warmup>,
    counter_file: Option<CounterFile>,
    max_groups: usize,
}

impl AdmissionGate {
    /// Builds a gate from `config`, using `clock` for every wait.
    ///
    /// Restores persisted quota counters when `config.counters_file` is set, and
    /// the call totals too if the file was written on the current UTC day. An
    /// unreadable file is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` does not validate.
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        let now = clock.now();
        let wall_now = clock.wall_now();
        let mut quotas = QuotaTracker::new(|c| config.daily_cap(c), config.quota_window, wall_now);
        let stats = CallStats::new();
        let mut cooldown = CooldownController::new();

        let counter_file = config.counters_file.as_ref().map(CounterFile::new);
        if let Some(file) = &counter_file {
            match file.load() {
                Ok(Some(stored)) => {
                    for counter in stored.counters {
                        quotas.restore(
                            counter.category,
                            counter.count_today,
                            counter.day_window_start,
                            wall_now,
                        );
                    }
                    if stored.saved_at.date_naive() == wall_now.date_naive() {
                        stats.carry_over(stored.totals.api_calls);
                        cooldown.restore_totals(
                            stored.totals.flood_waits,
                            stored.totals.flood_wait_seconds_total,
                        );
                    }
                    log::info!("Restored quota counters from {}", file.path().display());
                }
                Ok(None) => {}
                Err(e) => log::warn!(
                    "Ignoring quota counters in {}: {:#}",
                    file.path().display(),
                    e
                ),
            }
        }

        let warmup = config
            .warmup_enabled
            .then(|| Warmup::linear(now, config.warmup_period(), config.warmup_floor()));

        log::info!(
            "Admission gate ready: {} RPS (burst {}), {} DM/day, {} joins/day{}",
            config.rate_rps,
            config.bucket_capacity(),
            config.max_dm_per_day,
            config.max_joins_per_day,
            if warmup.is_some() { ", warmup on" } else { "" }
        );

        let gate = AdmissionGate {
            state: Mutex::new(LimiterState {
                max_rate: config.rate_rps,
                bucket: TokenBucket::new(config.rate_rps, config.bucket_capacity(), now),
                quotas,
                cooldown,
                window: AdmissionWindow::new(RATE_WINDOW_MAX_ENTRIES, RATE_MEASUREMENT_WINDOW),
                save_seq: 0,
            }),
            stats,
            pacer: Pacer::new(Arc::clone(&clock)),
            clock,
            warmup,
            counter_file,
            max_groups: config.max_groups,
        };
        Ok(gate)
    }

    /// Replaces the warmup ramp (or installs one when config left it off).
    pub fn with_warmup(mut self, warmup: Warmup) -> Self {
        self.warmup = Some(warmup);
        self
    }

    /// Changes the configured steady-state rate.
    ///
    /// During warmup the bucket refills at this rate scaled by the ramp.
    pub async fn update_rps(&self, new_rps: f64) -> Result<(), ConfigError> {
        if !new_rps.is_finite() || new_rps <= 0.0 {
            return Err(ConfigError::InvalidRate(new_rps));
        }
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        log::info!("Rate limit changed: {} RPS -> {} RPS", state.max_rate, new_rps);
        state.max_rate = new_rps;
        self.apply_warmup(&mut state, now);
        Ok(())
    }

    /// Records a flood-wait signal and arms the account-wide cooldown.
    ///
    /// Returns the cooldown deadline. [`Self::safe_call`] does this itself when an
    /// operation fails with [`crate::CallError::FloodWait`].
    pub async fn on_throttled(&self, wait_seconds: u64, category: QuotaCategory) -> Instant {
        let event = ThrottleEvent {
            timestamp: self.clock.wall_now(),
            wait_seconds,
            operation_category: category,
        };
        let (deadline, pending) = {
            let mut state = self.state.lock().await;
            let deadline = state.cooldown.on_throttled(event, self.clock.now());
            (deadline, self.snapshot(&mut state))
        };
        self.persist(pending).await;
        deadline
    }

    /// Time left in the active cooldown.
    pub async fn cooldown_remaining(&self) -> Duration {
        let state = self.state.lock().await;
        state.cooldown.remaining(self.clock.now())
    }

    /// Quota usage for `category` in the current day window.
    pub async fn quota_usage(&self, category: QuotaCategory) -> QuotaUsage {
        let state = self.state.lock().await;
        state.quotas.usage(category, self.clock.wall_now())
    }

    /// Pauses a bulk loop after `items_processed` items if its schedule says so.
    ///
    /// Independent of tokens and quotas; see [`crate::pacer`].
    pub async fn smart_pause(&self, context_label: &str, items_processed: u64) {
        self.pacer.pace(context_label, items_processed).await;
    }

    /// Snapshot of counters and the observed rate. Changes nothing.
    pub async fn get_stats(&self) -> StatsSnapshot {
        let state = self.state.lock().await;
        let now = self.clock.now();
        let wall_now = self.clock.wall_now();

        let categories: BTreeMap<_, _> = QuotaCategory::iter()
            .map(|category| {
                (
                    category,
                    CategoryStats {
                        calls: self.stats.successes_for(category),
                        flood_waits: state.cooldown.flood_waits_for(category),
                        quota: state.quotas.usage(category, wall_now),
                    },
                )
            })
            .collect();

        StatsSnapshot {
            api_calls: self.stats.api_calls(),
            flood_waits: state.cooldown.flood_waits(),
            current_rps: state.window.rate(now),
            effective_max_rps: state.bucket.rate(),
            flood_wait_seconds_total: state.cooldown.wait_seconds_total(),
            cooldown_remaining_secs: state.cooldown.remaining(now).as_secs_f64(),
            quota_rejections: self.stats.quota_rejections(),
            categories,
        }
    }

    /// Group membership ceiling from configuration; enforcing it is up to callers.
    pub fn max_groups(&self) -> usize {
        self.max_groups
    }

    /// The clock this gate waits on.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn apply_warmup(&self, state: &mut LimiterState, now: Instant) {
        let target = match &self.warmup {
            Some(warmup) => warmup.effective_rate(state.max_rate, now),
            None => state.max_rate,
        };
        if (state.bucket.rate() - target).abs() > f64::EPSILON * target.max(1.0) {
            log::debug!("Bucket refill rate {:.3} -> {:.3} RPS", state.bucket.rate(), target);
            state.bucket.update_rps(target, now);
        }
    }

    /// Numbers and captures the file contents. `None` when nothing is persisted.
    fn snapshot(&self, state: &mut LimiterState) -> Option<PendingSave> {
        self.counter_file.as_ref()?;
        state.save_seq += 1;
        let totals = StoredTotals {
            api_calls: self.stats.api_calls(),
            flood_waits: state.cooldown.flood_waits(),
            flood_wait_seconds_total: state.cooldown.wait_seconds_total(),
        };
        Some(PendingSave {
            seq: state.save_seq,
            contents: StoredCounters::new(&state.quotas.counters(), totals, self.clock.wall_now()),
        })
    }

    /// Writes a captured snapshot. Must be called without the state lock held.
    async fn persist(&self, pending: Option<PendingSave>) {
        let (Some(file), Some(pending)) = (&self.counter_file, pending) else {
            return;
        };
        if let Err(e) = file.save(pending.seq, &pending.contents).await {
            log::warn!(
                "Failed to save quota counters to {}: {:#}",
                file.path().display(),
                e
            );
        }
    }

    /// Captures and writes the current counters and totals.
    async fn checkpoint(&self) {
        let pending = {
            let mut state = self.state.lock().await;
            self.snapshot(&mut state)
        };
        self.persist(pending).await;
    }
}
