// gate/retry.rs
// Opt-in retry of throttled calls

use std::future::Future;

use super::AdmissionGate;
use crate::error_handling::{get_retry_strategy, CallError, GateError};
use crate::models::QuotaCategory;

impl AdmissionGate {
    /// Like [`Self::safe_call_weighted`], but retries calls the platform throttled.
    ///
    /// After a [`GateError::Throttled`] the call is retried up to `max_retries`
    /// times. Each retry waits for the cooldown to end plus an exponential backoff
    /// (1s, 2s, 4s, ...). Every attempt reserves quota again.
    /// Other errors are returned immediately.
    ///
    /// [`crate::config::DEFAULT_MAX_RETRIES`] is the usual choice for `max_retries`.
    pub async fn safe_call_with_retry<T, F, Fut>(
        &self,
        category: QuotaCategory,
        weight: u32,
        max_retries: usize,
        mut operation: F,
    ) -> Result<T, GateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let mut backoff = get_retry_strategy().take(max_retries);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .safe_call_weighted(category, weight, || operation())
                .await
            {
                Err(err @ GateError::Throttled { .. }) => {
                    let Some(delay) = backoff.next() else {
                        log::error!(
                            "Giving up on {} call after {} attempts: {}",
                            category,
                            attempt,
                            err
                        );
                        return Err(err);
                    };
                    let pause = self.cooldown_remaining().await + delay;
                    log::warn!(
                        "{} call throttled, retry {}/{} in {:.1}s",
                        category,
                        attempt,
                        max_retries,
                        pause.as_secs_f64()
                    );
                    self.clock.sleep(pause).await;
                }
                result => return result,
            }
        }
    }
}
