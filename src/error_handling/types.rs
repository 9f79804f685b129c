//! Error type definitions.
//!
//! This module defines the error types raised by wrapped remote operations, by
//! the admission gate, and by configuration and initialization.

use std::time::Duration;

use log::SetLoggerError;
use thiserror::Error;

use crate::models::QuotaCategory;

/// Failure reported by a remote operation passed to the gate.
///
/// The gate recognizes two conditions: `FloodWait` (intercepted, turned into
/// [`GateError::Throttled`] after arming the cooldown) and `AdminRequired`
/// (propagated unchanged like any other failure).
#[derive(Error, Debug)]
pub enum CallError {
    /// The platform asked us to wait before issuing more requests.
    #[error("flood wait: retry after {seconds}s")]
    FloodWait {
        /// Seconds the platform asked us to wait.
        seconds: u64,
    },

    /// The operation needs administrator privileges in the target group.
    #[error("administrator privileges required: {0}")]
    AdminRequired(String),

    /// Anything else the operation failed with.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Error returned by [`crate::AdmissionGate`] calls.
#[derive(Error, Debug)]
pub enum GateError {
    /// Daily cap for the category is reached; only the next day window helps.
    #[error("daily {category} quota exceeded ({used}/{cap}), try again in the next day window")]
    QuotaExceeded {
        /// Category whose cap was hit.
        category: QuotaCategory,
        /// Units already used in the current window.
        used: u32,
        /// Configured daily cap.
        cap: u32,
    },

    /// The platform throttled the call; the cooldown is already recorded.
    #[error("rate limited by remote platform during {category} call, cooling down for {}s", wait.as_secs())]
    Throttled {
        /// Wait requested by the platform.
        wait: Duration,
        /// Category of the call that was throttled.
        category: QuotaCategory,
    },

    /// The operation failed for a reason unrelated to rate limiting.
    #[error("remote operation failed: {0}")]
    OperationFailed(#[source] CallError),

    /// The caller cancelled while waiting for admission.
    #[error("admission wait cancelled")]
    Cancelled,
}

impl GateError {
    /// Returns `true` for errors the caller may retry later.
    pub fn is_throttled(&self) -> bool {
        matches!(self, GateError::Throttled { .. })
    }
}

/// Invalid configuration values.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// Rate must be a finite positive number.
    #[error("rate must be a positive number of requests per second, got {0}")]
    InvalidRate(f64),

    /// Burst must be zero (auto) or at least one token.
    #[error("burst must be 0 (auto) or >= 1, got {0}")]
    InvalidBurst(f64),

    /// Warmup period must be positive when warmup is enabled.
    #[error("warmup period must be at least one hour when warmup is enabled")]
    InvalidWarmupPeriod,
}

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Configuration rejected before building the gate.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}
