use super::types::{BreakerConfig, BreakerSnapshot, CircuitState};
use crate::error::RelayError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker for a single upstream dependency.
///
/// One breaker is constructed per upstream integration and injected into the
/// fetcher that owns the call path; there is no shared global instance.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: Arc<RwLock<State>>,
}

#[derive(Debug)]
struct State {
    /// Current circuit state
    circuit_state: CircuitState,
    /// Consecutive failures observed since the last success
    consecutive_failures: u32,
    /// Earliest instant a trial call is admitted while open
    next_attempt_at: Option<Instant>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker in the closed state
    pub fn new(config: BreakerConfig) -> Self {
        info!(
            failure_threshold = config.failure_threshold,
            reset_timeout_ms = config.reset_timeout_ms,
            "Creating circuit breaker"
        );

        Self {
            config,
            state: Arc::new(RwLock::new(State {
                circuit_state: CircuitState::Closed,
                consecutive_failures: 0,
                next_attempt_at: None,
            })),
        }
    }

    /// Execute a unit of work through the breaker.
    ///
    /// The whole unit counts as a single success/failure event, regardless of
    /// how many retries run inside it. While open and before the reset
    /// timeout, the work is never invoked and `RelayError::BreakerOpen` is
    /// returned. The first call arriving after the timeout is admitted as the
    /// half-open trial; a concurrent caller racing the same window may also
    /// slip through, which is accepted for this call path (the units of work
    /// are idempotent catalog reads).
    pub async fn execute<F, Fut, T>(&self, work: F) -> Result<T, RelayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RelayError>>,
    {
        {
            let mut state = self.state.write().await;

            if state.circuit_state == CircuitState::Open {
                if let Some(next_attempt_at) = state.next_attempt_at {
                    let now = Instant::now();
                    if now < next_attempt_at {
                        let retry_after = next_attempt_at.saturating_duration_since(now);
                        debug!(
                            retry_after_ms = retry_after.as_millis() as u64,
                            "Circuit breaker open, rejecting call"
                        );
                        return Err(RelayError::BreakerOpen {
                            retry_after_ms: retry_after.as_millis() as u64,
                        });
                    }
                }

                state.circuit_state = CircuitState::HalfOpen;
                info!("Circuit breaker moved to half-open, admitting trial call");
            }
        }

        // The lock is never held across the awaited work.
        match work().await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(e) => {
                self.on_failure(&e).await;
                Err(e)
            }
        }
    }

    /// Read-only snapshot for status reporting; never causes a transition.
    pub async fn snapshot(&self) -> BreakerSnapshot {
        let state = self.state.read().await;
        BreakerSnapshot {
            state: state.circuit_state,
            failure_count: state.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            next_attempt: if state.circuit_state == CircuitState::Open {
                state.next_attempt_at
            } else {
                None
            },
        }
    }

    async fn on_success(&self) {
        let mut state = self.state.write().await;

        match state.circuit_state {
            CircuitState::HalfOpen => {
                info!("Circuit breaker trial call succeeded, closing circuit");
                Self::transition_to_closed(&mut state);
            }
            _ => {
                state.consecutive_failures = 0;
            }
        }
    }

    async fn on_failure(&self, error: &RelayError) {
        let mut state = self.state.write().await;

        state.consecutive_failures += 1;
        warn!(
            failures = state.consecutive_failures,
            threshold = self.config.failure_threshold,
            error = %error,
            "Circuit breaker recorded failure"
        );

        match state.circuit_state {
            CircuitState::HalfOpen => {
                warn!("Circuit breaker trial call failed, reopening circuit");
                self.transition_to_open(&mut state);
            }
            CircuitState::Closed => {
                if state.consecutive_failures >= self.config.failure_threshold {
                    self.transition_to_open(&mut state);
                }
            }
            CircuitState::Open => {
                // A racing trial that lost to another reopen; the circuit is
                // already open with a fresh deadline.
                debug!("Failure recorded while already open");
            }
        }
    }

    fn transition_to_open(&self, state: &mut State) {
        let next_attempt_at = Instant::now() + self.config.reset_timeout();
        state.circuit_state = CircuitState::Open;
        state.next_attempt_at = Some(next_attempt_at);

        warn!(
            reopen_in_ms = self.config.reset_timeout_ms,
            "Circuit breaker opened"
        );
    }

    fn transition_to_closed(state: &mut State) {
        state.circuit_state = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.next_attempt_at = None;
    }
}
