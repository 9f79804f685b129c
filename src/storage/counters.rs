//! Quota counter file.
//!
//! Daily counters and the day's call totals are written to a small JSON file so
//! a restart within the same day window does not hand out a fresh quota.
//!
//! Saves are asynchronous and may be issued from several tasks at once. Each
//! save carries a sequence number taken under the gate's state lock; a save
//! older than the last one written is skipped, so the file never goes back in
//! time.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::models::QuotaCategory;
use crate::rate_limiter::QuotaCounter;

/// One persisted counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCounter {
    /// Category of the counter.
    pub category: QuotaCategory,
    /// Units used in the window.
    pub count_today: u32,
    /// When the window was opened.
    pub day_window_start: DateTime<Utc>,
}

/// Call totals carried across restarts on the same UTC day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTotals {
    /// Successful calls.
    pub api_calls: u64,
    /// Throttle events.
    pub flood_waits: u64,
    /// Sum of requested flood-wait durations, in seconds.
    pub flood_wait_seconds_total: u64,
}

/// File contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCounters {
    /// When the file was written.
    pub saved_at: DateTime<Utc>,
    /// One entry per category.
    pub counters: Vec<StoredCounter>,
    /// Files written before totals were kept have none.
    #[serde(default)]
    pub totals: StoredTotals,
}

impl StoredCounters {
    /// File contents for `counters` and `totals` as of `saved_at`.
    pub fn new(counters: &[QuotaCounter], totals: StoredTotals, saved_at: DateTime<Utc>) -> Self {
        StoredCounters {
            saved_at,
            counters: counters
                .iter()
                .map(|c| StoredCounter {
                    category: c.category,
                    count_today: c.count_today,
                    day_window_start: c.day_window_start,
                })
                .collect(),
            totals,
        }
    }
}

/// JSON counter file at a fixed path.
#[derive(Debug)]
pub struct CounterFile {
    path: PathBuf,
    // Sequence number of the last save that reached the disk.
    last_saved: Mutex<u64>,
}

impl CounterFile {
    /// Uses `path` for loading and saving.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CounterFile {
            path: path.into(),
            last_saved: Mutex::new(0),
        }
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file. A missing file is `Ok(None)`.
    ///
    /// Only called while the gate is being built, before any task can share it.
    pub fn load(&self) -> Result<Option<StoredCounters>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(&self.path).context("Failed to read counter file")?;
        let stored: StoredCounters =
            serde_json::from_str(&content).context("Failed to parse counter file")?;
        Ok(Some(stored))
    }

    /// Writes `stored` as save number `seq`, replacing the previous file in one
    /// rename.
    ///
    /// Returns `Ok(false)` without touching the disk when a save with an equal
    /// or higher `seq` has already been written.
    pub async fn save(&self, seq: u64, stored: &StoredCounters) -> Result<bool> {
        let mut last_saved = self.last_saved.lock().await;
        if seq <= *last_saved {
            log::debug!("Skipping stale counter save #{} (file has #{})", seq, *last_saved);
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create counter directory")?;
        }

        let content =
            serde_json::to_string_pretty(stored).context("Failed to serialize counters")?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .context("Failed to write counter file")?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .context("Failed to replace counter file")?;

        *last_saved = seq;
        Ok(true)
    }

    /// Holds the writer, as a long-running save would.
    #[cfg(test)]
    pub(crate) async fn lock_writer(&self) -> tokio::sync::MutexGuard<'_, u64> {
        self.last_saved.lock().await
    }
}
