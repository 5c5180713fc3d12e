//! Retry and failover policy.
//!
//! # Responsibilities
//! - Retry a failed forward against the same backend, with backoff
//! - Demote a backend once its retry budget is spent
//! - Fail over to another live backend, up to the attempt ceiling
//!
//! # Design Decisions
//! - Per-request counters live in an explicit `RetryState`, not in ambient context
//! - Failover is a bounded loop, so the attempt ceiling is visible in one place
//! - The policy is generic over the forwarding step, which keeps it testable
//!   without sockets

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time;

use crate::config::RetryConfig;
use crate::load_balancer::{backend::Backend, pool::ServerPool};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Why a request could not be served by any backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no live backend available (attempt {attempts})")]
    NoLiveBackend { attempts: u32 },

    #[error("request failed on {attempts} backends")]
    AttemptsExhausted { attempts: u32 },
}

/// Per-request retry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Forwards made against the current backend, starting at 1.
    pub retries: u32,
    /// Distinct backends dispatched to, starting at 1. Never resets.
    pub attempts: u32,
}

impl RetryState {
    pub const BASE_RETRIES: u32 = 1;
    pub const BASE_ATTEMPTS: u32 = 1;

    pub fn new() -> Self {
        Self {
            retries: Self::BASE_RETRIES,
            attempts: Self::BASE_ATTEMPTS,
        }
    }

    /// One more forward against the same backend.
    pub fn record_retry(&mut self) {
        self.retries += 1;
    }

    /// Move on to a different backend.
    pub fn next_backend(&mut self) {
        self.attempts += 1;
        self.retries = Self::BASE_RETRIES;
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

/// A successful dispatch: the backend that answered and what it returned.
#[derive(Debug)]
pub struct Dispatched<T> {
    pub backend: Arc<Backend>,
    pub value: T,
    pub state: RetryState,
}

/// Process-wide retry and failover ceilings.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    retry_limit: u32,
    /// Maximum number of distinct backends tried per request.
    attempt_limit: u32,
    backoff_ms: u64,
    max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            retry_limit: config.retry_limit,
            attempt_limit: config.attempt_limit,
            backoff_ms: config.backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        }
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Maximum number of distinct backends one request is dispatched to.
    pub fn attempt_limit(&self) -> u32 {
        self.attempt_limit
    }

    fn backoff(&self, state: &RetryState) -> Duration {
        calculate_backoff(state.retries, self.backoff_ms, self.max_backoff_ms)
    }

    /// Select a backend from `pool` and hand it to `forward`, retrying and
    /// failing over on error until a forward succeeds or a ceiling is hit.
    pub async fn dispatch<T, E, F, Fut>(
        &self,
        pool: &ServerPool,
        mut forward: F,
    ) -> Result<Dispatched<T>, DispatchError>
    where
        F: FnMut(Arc<Backend>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut state = RetryState::new();

        loop {
            let backend = match pool.select_next() {
                Some(backend) => backend,
                None => {
                    tracing::warn!(attempts = state.attempts, "No live backend available");
                    return Err(DispatchError::NoLiveBackend {
                        attempts: state.attempts,
                    });
                }
            };

            loop {
                match forward(backend.clone()).await {
                    Ok(value) => {
                        return Ok(Dispatched {
                            backend,
                            value,
                            state,
                        })
                    }
                    Err(e) if state.retries < self.retry_limit => {
                        let delay = self.backoff(&state);
                        tracing::warn!(
                            backend = %backend,
                            retries = state.retries,
                            attempts = state.attempts,
                            delay = ?delay,
                            error = %e,
                            "Forwarding failed, retrying same backend"
                        );
                        metrics::record_retry(&backend.to_string());
                        time::sleep(delay).await;
                        state.record_retry();
                    }
                    Err(e) => {
                        tracing::warn!(
                            backend = %backend,
                            retries = state.retries,
                            attempts = state.attempts,
                            error = %e,
                            "Forwarding failed, retry budget spent"
                        );
                        break;
                    }
                }
            }

            if pool.mark_backend(backend.url(), false) == Some(true) {
                tracing::warn!(backend = %backend, "Backend marked dead after repeated failures");
                metrics::record_backend_liveness(&backend.to_string(), false);
            }

            if state.attempts >= self.attempt_limit {
                tracing::error!(attempts = state.attempts, "Attempt ceiling reached, giving up");
                return Err(DispatchError::AttemptsExhausted {
                    attempts: state.attempts,
                });
            }

            state.next_backend();
            metrics::record_failover();
            tracing::info!(attempts = state.attempts, "Failing over to another backend");
        }
    }
}
