//! Error categorization and retry strategy.
//!
//! This module classifies operation failures for the gate and configures the
//! backoff used by the opt-in retry wrapper.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use super::types::CallError;

/// Creates the exponential backoff applied between flood-wait retries.
///
/// Yields `RETRY_INITIAL_DELAY_MS`, then doubles on each step up to
/// `RETRY_MAX_DELAY_SECS`. The iterator is unbounded; callers `take` as many
/// delays as they allow retries.
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    // ExponentialBackoff yields base^n * factor, so base 2 with factor
    // INITIAL / 2 gives INITIAL, 2 * INITIAL, 4 * INITIAL, ...
    ExponentialBackoff::from_millis(crate::config::RETRY_FACTOR)
        .factor(crate::config::RETRY_INITIAL_DELAY_MS / crate::config::RETRY_FACTOR)
        .max_delay(Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS))
}

/// How the gate treats an operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The platform signalled throttling for this many seconds.
    Throttled(u64),
    /// Anything else, propagated verbatim.
    Other,
}

/// Classifies a [`CallError`].
pub fn categorize_call_error(error: &CallError) -> FailureKind {
    match error {
        CallError::FloodWait { seconds } => FailureKind::Throttled(*seconds),
        CallError::AdminRequired(_) | CallError::Other(_) => FailureKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_retry_strategy_initial_delay() {
        let first_delay = get_retry_strategy().next().unwrap();
        assert_eq!(
            first_delay,
            Duration::from_millis(crate::config::RETRY_INITIAL_DELAY_MS)
        );
    }

    #[test]
    fn test_get_retry_strategy_doubles() {
        let delays: Vec<Duration> = get_retry_strategy().take(3).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[test]
    fn test_get_retry_strategy_max_delay() {
        let max_delay = Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS);
        for delay in get_retry_strategy().take(20) {
            assert!(delay <= max_delay, "Delay {:?} exceeds max {:?}", delay, max_delay);
        }
    }

    #[test]
    fn test_categorize_flood_wait() {
        let err = CallError::FloodWait { seconds: 17 };
        assert_eq!(categorize_call_error(&err), FailureKind::Throttled(17));
    }

    #[test]
    fn test_categorize_admin_required_is_not_throttling() {
        let err = CallError::AdminRequired("participants".into());
        assert_eq!(categorize_call_error(&err), FailureKind::Other);
        let err = CallError::Other(anyhow::anyhow!("boom"));
        assert_eq!(categorize_call_error(&err), FailureKind::Other);
    }
}
