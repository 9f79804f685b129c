//! Rate and quota state guarded by the admission gate.
//!
//! - `bucket`: token bucket bounding the steady request rate
//! - `quota`: per-category daily caps
//! - `cooldown`: account-wide pause after flood-wait signals
//! - `window`: trailing admissions, for the observed rate
//! - `warmup`: optional time-scaled rate ramp
//!
//! None of these types lock or sleep on their own. The gate owns one instance
//! of each behind a single mutex and does the waiting.

mod bucket;
mod cooldown;
mod quota;
mod warmup;
mod window;

pub use bucket::TokenBucket;
pub use cooldown::{CooldownController, ThrottleEvent};
pub use quota::{QuotaCounter, QuotaRejection, QuotaTracker, QuotaUsage};
pub use warmup::{Warmup, WarmupCurve};
pub(crate) use window::AdmissionWindow;
