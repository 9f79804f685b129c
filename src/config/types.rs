//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration. Every limiter option can also be supplied through the
//! environment (or a `.env` file), which is how deployments usually set them.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    DEFAULT_MAX_DM_PER_DAY, DEFAULT_MAX_GROUPS, DEFAULT_MAX_JOINS_PER_DAY, DEFAULT_RATE_RPS,
    DEFAULT_WARMUP_FLOOR, DEFAULT_WARMUP_PERIOD_HOURS,
};
use crate::error_handling::ConfigError;
use crate::models::QuotaCategory;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// How quota counters decide that a new day has started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum QuotaWindow {
    /// Counters reset when the UTC calendar date changes.
    Calendar,
    /// Counters reset 24 hours after the window was opened.
    Rolling,
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use flood_guard::Config;
///
/// let config = Config {
///     rate_rps: 2.0,
///     max_dm_per_day: 5,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Steady-state requests per second
    pub rate_rps: f64,

    /// Token bucket capacity (0 = same as `rate_rps`)
    pub rate_burst: f64,

    /// Daily cap on general API calls (`None` = uncapped)
    pub max_api_per_day: Option<u32>,

    /// Daily cap on direct messages
    pub max_dm_per_day: u32,

    /// Daily cap on join/leave actions
    pub max_joins_per_day: u32,

    /// Group membership ceiling, exposed for callers (not enforced by the gate)
    pub max_groups: usize,

    /// Ramp the rate up over `warmup_period_hours` after startup
    pub warmup_enabled: bool,

    /// Length of the warmup ramp in hours
    pub warmup_period_hours: u64,

    /// Day window policy for quota counters
    pub quota_window: QuotaWindow,

    /// JSON file persisting quota counters across restarts
    pub counters_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            rate_rps: DEFAULT_RATE_RPS,
            rate_burst: 0.0,
            max_api_per_day: None,
            max_dm_per_day: DEFAULT_MAX_DM_PER_DAY,
            max_joins_per_day: DEFAULT_MAX_JOINS_PER_DAY,
            max_groups: DEFAULT_MAX_GROUPS,
            warmup_enabled: false,
            warmup_period_hours: DEFAULT_WARMUP_PERIOD_HOURS,
            quota_window: QuotaWindow::Calendar,
            counters_file: None,
        }
    }
}

impl Config {
    /// Checks that the numeric settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a non-positive rate, a fractional burst
    /// below one token, or a zero-length warmup when warmup is enabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rate_rps.is_finite() || self.rate_rps <= 0.0 {
            return Err(ConfigError::InvalidRate(self.rate_rps));
        }
        if !self.rate_burst.is_finite()
            || self.rate_burst < 0.0
            || (self.rate_burst > 0.0 && self.rate_burst < 1.0)
        {
            return Err(ConfigError::InvalidBurst(self.rate_burst));
        }
        if self.warmup_enabled && self.warmup_period_hours == 0 {
            return Err(ConfigError::InvalidWarmupPeriod);
        }
        Ok(())
    }

    /// Bucket capacity: the configured burst, or one second of traffic.
    pub fn bucket_capacity(&self) -> f64 {
        if self.rate_burst > 0.0 {
            self.rate_burst
        } else {
            self.rate_rps.max(1.0)
        }
    }

    /// Daily cap for `category`, `None` when uncapped.
    pub fn daily_cap(&self, category: QuotaCategory) -> Option<u32> {
        match category {
            QuotaCategory::Api => self.max_api_per_day,
            QuotaCategory::Dm => Some(self.max_dm_per_day),
            QuotaCategory::JoinLeave => Some(self.max_joins_per_day),
        }
    }

    /// Warmup ramp length.
    pub fn warmup_period(&self) -> Duration {
        Duration::from_secs(self.warmup_period_hours * 3600)
    }

    /// Rate factor at the start of warmup.
    pub fn warmup_floor(&self) -> f64 {
        DEFAULT_WARMUP_FLOOR
    }
}

/// Command-line options and configuration.
///
/// All limiter options fall back to environment variables, so a `.env` file
/// with `RATE_RPS=2` works the same as `--rate-rps 2`.
///
/// # Examples
///
/// ```bash
/// # Check the effective limits and counters
/// flood_guard
///
/// # Push 5000 no-op calls through the gate, pausing like a member scan
/// RATE_RPS=8 flood_guard --simulate-items 5000 --pace-label participants
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "flood_guard",
    about = "Admission control for calls to a remote messaging platform."
)]
pub struct Opt {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Steady-state requests per second
    #[arg(long, env = "RATE_RPS", default_value_t = DEFAULT_RATE_RPS)]
    pub rate_rps: f64,

    /// Token bucket capacity (0 = one second of traffic)
    #[arg(long, env = "RATE_BURST", default_value_t = 0.0)]
    pub rate_burst: f64,

    /// Daily cap on general API calls (unset = uncapped)
    #[arg(long, env = "MAX_API_PER_DAY")]
    pub max_api_per_day: Option<u32>,

    /// Daily cap on direct messages
    #[arg(long, env = "MAX_DM_PER_DAY", default_value_t = DEFAULT_MAX_DM_PER_DAY)]
    pub max_dm_per_day: u32,

    /// Daily cap on join/leave actions
    #[arg(long, env = "MAX_JOINS_PER_DAY", default_value_t = DEFAULT_MAX_JOINS_PER_DAY)]
    pub max_joins_per_day: u32,

    /// Group membership ceiling reported to callers
    #[arg(long, env = "MAX_GROUPS", default_value_t = DEFAULT_MAX_GROUPS)]
    pub max_groups: usize,

    /// Ramp the request rate up gradually after startup
    #[arg(long, env = "WARMUP_ENABLED", default_value_t = false)]
    pub warmup_enabled: bool,

    /// Length of the warmup ramp in hours
    #[arg(long, env = "WARMUP_PERIOD_HOURS", default_value_t = DEFAULT_WARMUP_PERIOD_HOURS)]
    pub warmup_period_hours: u64,

    /// Quota day window: calendar|rolling
    #[arg(long, value_enum, env = "QUOTA_WINDOW", default_value_t = QuotaWindow::Calendar)]
    pub quota_window: QuotaWindow,

    /// JSON file persisting quota counters across restarts
    #[arg(long, env = "COUNTERS_FILE")]
    pub counters_file: Option<PathBuf>,

    /// Push this many no-op calls through the gate and report the result
    #[arg(long, default_value_t = 0)]
    pub simulate_items: u64,

    /// Category used for simulated calls: api|dm|join_leave
    #[arg(long, default_value_t = QuotaCategory::Api)]
    pub simulate_category: QuotaCategory,

    /// Pacing context for simulated calls (participants, export, ...)
    #[arg(long, default_value = "participants")]
    pub pace_label: String,
}

impl From<&Opt> for Config {
    fn from(opt: &Opt) -> Self {
        Config {
            log_level: opt.log_level.clone(),
            log_format: opt.log_format.clone(),
            rate_rps: opt.rate_rps,
            rate_burst: opt.rate_burst,
            max_api_per_day: opt.max_api_per_day,
            max_dm_per_day: opt.max_dm_per_day,
            max_joins_per_day: opt.max_joins_per_day,
            max_groups: opt.max_groups,
            warmup_enabled: opt.warmup_enabled,
            warmup_period_hours: opt.warmup_period_hours,
            quota_window: opt.quota_window,
            counters_file: opt.counters_file.clone(),
        }
    }
}
