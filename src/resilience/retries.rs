//! Cancellable scheduled retry.
//!
//! One primitive covers readiness polling (shared config, future async
//! singletons) and retried RPC connects. Dropping the returned future cancels
//! any pending attempt.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use crate::resilience::backoff::calculate_backoff;

/// Spacing between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Same delay before every retry.
    Fixed(Duration),
    /// Jittered exponential backoff, capped at `max_ms`.
    Exponential { base_ms: u64, max_ms: u64 },
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub schedule: Schedule,
}

impl RetryPolicy {
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            schedule: Schedule::Fixed(interval),
        }
    }

    pub fn exponential(base_ms: u64, max_ms: u64, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            schedule: Schedule::Exponential { base_ms, max_ms },
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.schedule {
            Schedule::Fixed(interval) => interval,
            Schedule::Exponential { base_ms, max_ms } => calculate_backoff(attempt, base_ms, max_ms),
        }
    }
}

impl Default for RetryPolicy {
    /// 100ms apart, 10 attempts.
    fn default() -> Self {
        Self::fixed(Duration::from_millis(100), 10)
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RetryError {
    #[error("Not available after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Run `check` until it yields a value or the attempt budget is spent.
///
/// The first check runs immediately.
pub async fn poll_until<T, F>(policy: RetryPolicy, mut check: F) -> Result<T, RetryError>
where
    F: FnMut() -> Option<T>,
{
    for attempt in 1..=policy.max_attempts {
        if let Some(value) = check() {
            return Ok(value);
        }
        if attempt < policy.max_attempts {
            tracing::trace!(attempt, "Not ready, waiting");
            sleep(policy.delay_after(attempt)).await;
        }
    }
    Err(RetryError::Exhausted {
        attempts: policy.max_attempts,
    })
}

/// Run the fallible async `op` until it succeeds, the error is not retryable,
/// or the attempt budget is spent. Returns the last error.
pub async fn retry_with<T, E, F, Fut, R>(
    policy: RetryPolicy,
    mut op: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && is_retryable(&e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
