//! Configuration constants.
//!
//! Defaults for the admission-control layer. Values mirror what the platform
//! tolerates for a single account in practice.

use std::time::Duration;

/// Steady-state requests per second
pub const DEFAULT_RATE_RPS: f64 = 4.0;
/// Direct messages per day window
pub const DEFAULT_MAX_DM_PER_DAY: u32 = 20;
/// Join/leave actions per day window
pub const DEFAULT_MAX_JOINS_PER_DAY: u32 = 20;
/// Group membership ceiling, enforced by callers rather than the gate
pub const DEFAULT_MAX_GROUPS: usize = 200;
/// Length of the warmup ramp for fresh accounts
pub const DEFAULT_WARMUP_PERIOD_HOURS: u64 = 24;
/// Rate factor at the very start of warmup
pub const DEFAULT_WARMUP_FLOOR: f64 = 0.25;

/// Trailing window used to measure the observed request rate
pub const RATE_MEASUREMENT_WINDOW: Duration = Duration::from_secs(1);
/// Upper bound on remembered admission timestamps
pub const RATE_WINDOW_MAX_ENTRIES: usize = 1024;

/// Stand-in for "never" when a deadline would overflow `Instant` arithmetic
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Flood waits longer than this are logged as an account-risk alert
pub const CRITICAL_FLOOD_WAIT_SECS: u64 = 600;
/// Emit an info line every this many successful calls
pub const API_CALL_LOG_INTERVAL: u64 = 100;

// Retry strategy (opt-in, caller side)
/// Delay before the first retry after a flood wait, on top of the cooldown
pub const RETRY_INITIAL_DELAY_MS: u64 = 1000;
/// Factor by which retry delay is multiplied on each attempt
pub const RETRY_FACTOR: u64 = 2;
/// Maximum backoff between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 60;
/// Default number of retries for `safe_call_with_retry`
pub const DEFAULT_MAX_RETRIES: usize = 3;
