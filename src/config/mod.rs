//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (default limits, retry timings, windows)
//! - CLI option types and parsing, with environment fallbacks

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel, Opt, QuotaWindow};
