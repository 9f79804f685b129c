//! Process-level setup: logging and the shared admission gate.

mod logger;

use std::sync::Arc;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::error_handling::InitializationError;
use crate::gate::AdmissionGate;

pub use logger::init_logger_with;

/// Builds the process-wide admission gate on the system clock.
///
/// The returned `Arc` is meant to be cloned into every task that issues remote
/// calls; all of them then share one bucket, one set of quotas and one cooldown.
///
/// # Errors
///
/// Returns [`InitializationError::ConfigError`] if `config` is invalid.
pub fn init_gate(config: &Config) -> Result<Arc<AdmissionGate>, InitializationError> {
    let gate = AdmissionGate::new(config, Arc::new(SystemClock))?;
    Ok(Arc::new(gate))
}
