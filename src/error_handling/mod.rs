//! Error handling.
//!
//! This module provides:
//! - Error types for remote operations, admission, configuration and startup
//! - Classification of operation failures (flood wait vs. everything else)
//! - The backoff strategy used by the opt-in retry wrapper

mod categorization;
mod types;

// Re-export public API
pub use categorization::{categorize_call_error, get_retry_strategy, FailureKind};
pub use types::{CallError, ConfigError, GateError, InitializationError};
