use super::types::RetryPolicy;
use crate::error::RelayError;
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use tracing::{debug, warn};

/// Retry executor with exponential backoff.
///
/// Runs a unit of work up to `max_retries + 1` times. Terminal failures
/// (4xx-class upstream replies) propagate immediately; everything else is
/// retried on the schedule `min(initial_delay * factor^(k-1), max_delay)`.
/// The schedule is exact: the underlying backoff has its randomization
/// disabled so tests can assert the full timing under a paused clock.
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create a new retry executor
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Execute a unit of work with retries
    pub async fn execute<F, Fut, T>(&self, mut work: F) -> Result<T, RelayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RelayError>>,
    {
        let mut backoff = self.create_backoff();
        let mut attempt: u32 = 0;

        loop {
            match work().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "Call succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(e) if e.is_terminal() => {
                    warn!(error = %e, "Client error from upstream, not retrying");
                    return Err(e);
                }
                Err(e) => {
                    if attempt >= self.policy.max_retries {
                        warn!(
                            attempts = attempt + 1,
                            error = %e,
                            "All attempts failed"
                        );
                        return Err(RelayError::RetriesExhausted {
                            attempts: attempt + 1,
                            source: Box::new(e),
                        });
                    }

                    let delay = backoff
                        .next_backoff()
                        .unwrap_or_else(|| self.policy.max_delay());
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.policy.initial_delay())
            .with_max_interval(self.policy.max_delay())
            .with_multiplier(self.policy.backoff_factor)
            // Exact delays; retries are bounded by max_retries, not elapsed time.
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }
}
