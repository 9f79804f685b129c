//! Extra spacing for long bulk scans.
//!
//! Per-call rate limiting keeps the request rate steady, but a session that
//! enumerates tens of thousands of members at that steady rate still looks like
//! a scraper. Bulk loops call [`Pacer::pace`] with their running item count and
//! get a pause every so often, growing mildly with the volume already done.
//! Quotas and tokens are not consulted.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use strum_macros::EnumString;

use crate::clock::Clock;

/// Kind of bulk loop, parsed from the label callers pass in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaceContext {
    /// Paging through a group's member list.
    Participants,
    /// Sending a batch of direct messages.
    DmBatch,
    /// Joining or leaving a series of groups.
    JoinBatch,
    /// Exporting several groups in one run.
    Export,
    /// Any other label.
    #[strum(disabled)]
    Generic,
}

impl PaceContext {
    /// Maps a free-form label to a context; unknown labels are `Generic`.
    pub fn from_label(label: &str) -> Self {
        PaceContext::from_str(label).unwrap_or(PaceContext::Generic)
    }

    /// Pause schedule for this context.
    pub fn policy(self) -> PacePolicy {
        match self {
            PaceContext::Participants => PacePolicy {
                every: 1000,
                base: Duration::from_secs(1),
                step: Duration::from_millis(50),
                max: Duration::from_secs(5),
            },
            PaceContext::DmBatch => PacePolicy::flat(20, Duration::from_secs(60)),
            PaceContext::JoinBatch => PacePolicy::flat(1, Duration::from_secs(3)),
            PaceContext::Export => PacePolicy {
                every: 3,
                base: Duration::from_secs(2),
                step: Duration::from_millis(500),
                max: Duration::from_secs(10),
            },
            PaceContext::Generic => PacePolicy::flat(1000, Duration::from_millis(500)),
        }
    }
}

/// Pause every `every` items: `base` the first time, then `step` longer for
/// each further multiple, never above `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacePolicy {
    /// Cadence in processed items.
    pub every: u64,
    /// First pause.
    pub base: Duration,
    /// Growth per cadence step.
    pub step: Duration,
    /// Ceiling.
    pub max: Duration,
}

impl PacePolicy {
    /// Same pause every time.
    pub const fn flat(every: u64, delay: Duration) -> Self {
        PacePolicy {
            every,
            base: delay,
            step: Duration::ZERO,
            max: delay,
        }
    }

    /// Pause owed after `items` processed items, if any.
    pub fn delay_for(&self, items: u64) -> Option<Duration> {
        if items == 0 || self.every == 0 || items % self.every != 0 {
            return None;
        }
        let steps = u32::try_from(items / self.every - 1).unwrap_or(u32::MAX);
        let delay = self.base.saturating_add(self.step.saturating_mul(steps));
        Some(delay.min(self.max))
    }
}

/// Sleeps according to the context's [`PacePolicy`].
pub struct Pacer {
    clock: Arc<dyn Clock>,
}

impl Pacer {
    /// Pacer sleeping on `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Pacer { clock }
    }

    /// Pause owed for `label` after `items` processed items.
    pub fn delay_for(label: &str, items: u64) -> Option<Duration> {
        PaceContext::from_label(label).policy().delay_for(items)
    }

    /// Suspends for the pause owed, if any.
    pub async fn pace(&self, label: &str, items: u64) {
        if let Some(delay) = Self::delay_for(label, items) {
            log::info!(
                "Smart pause: {} items processed ({}), sleeping {:.2}s",
                items,
                label,
                delay.as_secs_f64()
            );
            self.clock.sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Utc;

    #[test]
    fn test_labels_map_to_contexts() {
        assert_eq!(PaceContext::from_label("participants"), PaceContext::Participants);
        assert_eq!(PaceContext::from_label("dm_batch"), PaceContext::DmBatch);
        assert_eq!(PaceContext::from_label("JOIN_BATCH"), PaceContext::JoinBatch);
        assert_eq!(PaceContext::from_label("export"), PaceContext::Export);
        assert_eq!(PaceContext::from_label("generic"), PaceContext::Generic);
        assert_eq!(PaceContext::from_label("whatever"), PaceContext::Generic);
    }

    #[test]
    fn test_participants_pause_grows_with_volume() {
        assert_eq!(Pacer::delay_for("participants", 0), None);
        assert_eq!(Pacer::delay_for("participants", 999), None);
        assert_eq!(
            Pacer::delay_for("participants", 1000),
            Some(Duration::from_secs(1))
        );
        assert_eq!(
            Pacer::delay_for("participants", 10_000),
            Some(Duration::from_millis(1450))
        );
        assert_eq!(
            Pacer::delay_for("participants", 1_000_000),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_flat_policies() {
        assert_eq!(Pacer::delay_for("dm_batch", 19), None);
        assert_eq!(Pacer::delay_for("dm_batch", 40), Some(Duration::from_secs(60)));
        assert_eq!(Pacer::delay_for("join_batch", 1), Some(Duration::from_secs(3)));
        assert_eq!(Pacer::delay_for("join_batch", 7), Some(Duration::from_secs(3)));
        assert_eq!(Pacer::delay_for("unknown", 2000), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_export_pause_every_few_groups() {
        assert_eq!(Pacer::delay_for("export", 1), None);
        assert_eq!(Pacer::delay_for("export", 3), Some(Duration::from_secs(2)));
        assert_eq!(Pacer::delay_for("export", 6), Some(Duration::from_millis(2500)));
        assert_eq!(Pacer::delay_for("export", 300), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_zero_cadence_never_pauses() {
        let policy = PacePolicy::flat(0, Duration::from_secs(1));
        assert_eq!(policy.delay_for(10), None);
    }

    #[tokio::test]
    async fn test_pace_sleeps_on_clock() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let pacer = Pacer::new(clock.clone());

        for items in 1..=3000 {
            pacer.pace("participants", items).await;
        }

        // 1s at 1000, 1.05s at 2000, 1.1s at 3000
        assert_eq!(clock.elapsed(), Duration::from_millis(3150));
        assert_eq!(clock.sleep_count(), 3);
    }
}
