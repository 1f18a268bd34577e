//! Bounded exponential backoff for remote calls.
//!
//! Transient [`ServiceError`]s are retried until `max_attempts` attempts
//! have been made; permanent errors return immediately. Backoff sleeps are
//! cancellable so a run deadline never waits out a long delay.

use crate::analysis::service::ServiceError;
use crate::defaults;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry configuration (the `[analysis.retry]` config section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1).
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    pub initial_backoff_ms: u64,
    /// Delay cap in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_ATTEMPTS,
            initial_backoff_ms: defaults::INITIAL_BACKOFF_MS,
            max_backoff_ms: defaults::MAX_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }
}

/// Run `operation` under `policy`, retrying transient failures.
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "speech-to-text")
/// * `policy` - Attempt limit and backoff
/// * `cancel` - Aborts the wait between attempts and any further attempts
/// * `operation` - Closure producing one attempt
pub async fn retry_transient<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        let outcome = tokio::select! {
            result = operation() => result,
            _ = cancel.cancelled() => return Err(ServiceError::Cancelled),
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Remote call succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if !err.is_transient() => {
                tracing::debug!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "Remote call failed permanently"
                );
                return Err(err);
            }
            Err(err) if attempt >= max_attempts => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "Remote call failed: retries exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                let backoff = policy.backoff_for(attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient failure, will retry after backoff"
                );
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = cancel.cancelled() => return Err(ServiceError::Cancelled),
                }
            }
        }
    }
}
