//! flood_guard library: admission control for calls to a remote messaging platform
//!
//! Every remote call is funnelled through one [`AdmissionGate`], which keeps the
//! account under the platform's anti-abuse thresholds:
//!
//! - a token bucket bounds the steady request rate,
//! - per-category daily quotas cap direct messages and join/leave actions,
//! - a flood-wait signal from the platform pauses the whole account,
//! - bulk loops get extra pauses via [`AdmissionGate::smart_pause`].
//!
//! # Example
//!
//! ```no_run
//! use flood_guard::initialization::init_gate;
//! use flood_guard::{CallError, Config, QuotaCategory};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gate = init_gate(&Config::default())?;
//!
//! let members = gate
//!     .safe_call(QuotaCategory::Api, || async {
//!         // talk to the platform here
//!         Ok::<_, CallError>(vec!["alice", "bob"])
//!     })
//!     .await?;
//!
//! for (i, _member) in members.iter().enumerate() {
//!     gate.smart_pause("participants", i as u64 + 1).await;
//! }
//! println!("{}", serde_json::to_string(&gate.get_stats().await)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! The gate waits with `tokio::time` (through [`SystemClock`]), so it must run
//! inside a Tokio runtime.

#![warn(missing_docs)]

pub mod clock;
pub mod config;
mod error_handling;
mod gate;
pub mod initialization;
mod models;
pub mod pacer;
pub mod rate_limiter;
mod stats;
pub mod storage;

// Re-export public API
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, LogFormat, LogLevel, Opt, QuotaWindow};
pub use error_handling::{CallError, ConfigError, GateError, InitializationError};
pub use gate::AdmissionGate;
pub use models::QuotaCategory;
pub use pacer::{PaceContext, PacePolicy, Pacer};
pub use rate_limiter::{QuotaUsage, Warmup, WarmupCurve};
pub use stats::{CategoryStats, StatsSnapshot};
