// gate/call.rs
// Admission and execution of a single wrapped call

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{AdmissionGate, PendingSave};
use crate::config::{API_CALL_LOG_INTERVAL, FAR_FUTURE};
use crate::error_handling::{categorize_call_error, CallError, FailureKind, GateError};
use crate::models::QuotaCategory;

impl AdmissionGate {
    /// Runs `operation` once admitted, with weight 1.
    ///
    /// See [`Self::safe_call_weighted`].
    pub async fn safe_call<T, F, Fut>(
        &self,
        category: QuotaCategory,
        operation: F,
    ) -> Result<T, GateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        self.safe_call_weighted(category, 1, operation).await
    }

    /// Waits for admission, then runs `operation` exactly once.
    ///
    /// # Errors
    ///
    /// - [`GateError::QuotaExceeded`] if the daily cap for `category` would be
    ///   exceeded; `operation` is not run.
    /// - [`GateError::Throttled`] if `operation` reported a flood wait; the
    ///   cooldown is armed before returning.
    /// - [`GateError::OperationFailed`] for any other failure of `operation`.
    ///
    /// Quota is reserved before `operation` runs and is not refunded if it fails.
    /// Dropping the returned future while it waits consumes nothing.
    pub async fn safe_call_weighted<T, F, Fut>(
        &self,
        category: QuotaCategory,
        weight: u32,
        operation: F,
    ) -> Result<T, GateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let pending = self.admit(category, weight).await?;
        self.persist(pending).await;
        self.execute(category, operation).await
    }

    /// Like [`Self::safe_call_weighted`], but gives up with
    /// [`GateError::Cancelled`] if `token` fires before admission.
    ///
    /// Once admitted the operation runs to completion regardless of `token`.
    pub async fn safe_call_cancellable<T, F, Fut>(
        &self,
        token: &CancellationToken,
        category: QuotaCategory,
        weight: u32,
        operation: F,
    ) -> Result<T, GateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let pending = tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::debug!("Admission wait for {} call cancelled", category);
                return Err(GateError::Cancelled);
            }
            admitted = self.admit(category, weight) => admitted?,
        };
        self.persist(pending).await;
        self.execute(category, operation).await
    }

    /// Blocks until a token and quota are held for one call.
    ///
    /// Every await point is either the state lock or a sleep with the lock
    /// released, so dropping this future never leaves a token or quota unit
    /// taken.
    ///
    /// A reservation against a capped category returns the counter file
    /// contents to write; the caller saves them after the lock is gone.
    pub(super) async fn admit(
        &self,
        category: QuotaCategory,
        weight: u32,
    ) -> Result<Option<PendingSave>, GateError> {
        loop {
            let wake_at = {
                let mut state = self.state.lock().await;
                let now = self.clock.now();

                if let Some(deadline) = state.cooldown.active_deadline(now) {
                    log::debug!(
                        "{} call waiting {:.1}s for cooldown",
                        category,
                        (deadline - now).as_secs_f64()
                    );
                    deadline
                } else {
                    self.apply_warmup(&mut state, now);
                    match state.bucket.try_acquire(now) {
                        Ok(()) => {
                            state.window.record(now);
                            let wall_now = self.clock.wall_now();
                            return match state.quotas.reserve(category, weight, wall_now) {
                                Ok(usage) => match usage.cap {
                                    Some(cap) => {
                                        log::debug!("{} quota: {}/{}", category, usage.used, cap);
                                        Ok(self.snapshot(&mut state))
                                    }
                                    None => Ok(None),
                                },
                                Err(rejection) => {
                                    self.stats.record_quota_rejection(category);
                                    log::warn!(
                                        "Daily {} limit reached ({}/{}), refusing call",
                                        category,
                                        rejection.used,
                                        rejection.cap
                                    );
                                    Err(GateError::QuotaExceeded {
                                        category,
                                        used: rejection.used,
                                        cap: rejection.cap,
                                    })
                                }
                            };
                        }
                        Err(wait) => now
                            .checked_add(wait)
                            .or_else(|| now.checked_add(FAR_FUTURE))
                            .unwrap_or(now),
                    }
                }
            };
            self.clock.sleep_until(wake_at).await;
        }
    }

    async fn execute<T, F, Fut>(&self, category: QuotaCategory, operation: F) -> Result<T, GateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        match operation().await {
            Ok(value) => {
                let total = self.stats.record_success(category);
                if total % API_CALL_LOG_INTERVAL == 0 {
                    self.checkpoint().await;
                    let stats = self.get_stats().await;
                    log::info!(
                        "API calls: {}, current rate: {:.2} RPS, flood waits: {}",
                        total,
                        stats.current_rps,
                        stats.flood_waits
                    );
                }
                Ok(value)
            }
            Err(err) => match categorize_call_error(&err) {
                FailureKind::Throttled(seconds) => {
                    let deadline: Instant = self.on_throttled(seconds, category).await;
                    log::debug!(
                        "{} call throttled, cooldown until {:?}",
                        category,
                        deadline
                    );
                    Err(GateError::Throttled {
                        wait: Duration::from_secs(seconds),
                        category,
                    })
                }
                FailureKind::Other => {
                    log::debug!("{} call failed: {}", category, err);
                    Err(GateError::OperationFailed(err))
                }
            },
        }
    }
}
