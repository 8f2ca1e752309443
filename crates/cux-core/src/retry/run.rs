//! Retry loop: run a remote call until success or the policy says stop.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::classify;
use super::error::{CallError, ServiceError};
use super::policy::{RetryDecision, RetryPolicy};

/// Injected observer for retry events, so callers (and tests) can see
/// warnings without relying on global subscriber state.
pub trait RetryObserver {
    /// A throttled call is about to be retried after `delay`.
    /// `attempt` is 1-based, `max_retries` is the configured budget.
    fn on_retry(&self, err: &ServiceError, delay: Duration, attempt: u32, max_retries: u32);
}

/// Default observer that emits `tracing` warnings.
pub struct TracingObserver;

impl RetryObserver for TracingObserver {
    fn on_retry(&self, err: &ServiceError, delay: Duration, attempt: u32, max_retries: u32) {
        tracing::warn!(
            code = %err.code,
            delay_secs = delay.as_secs_f64(),
            "rate limited, retrying in {:.2}s (attempt {}/{})",
            delay.as_secs_f64(),
            attempt,
            max_retries
        );
    }
}

/// Observer that drops all events (bench/test use).
pub struct NullObserver;

impl RetryObserver for NullObserver {
    fn on_retry(&self, _: &ServiceError, _: Duration, _: u32, _: u32) {}
}

/// Runs an async operation until it succeeds or the retry policy says to
/// stop. Throttled failures sleep for the backoff duration and retry;
/// anything else fails immediately with no sleep.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    observer: &dyn RetryObserver,
    mut f: F,
) -> Result<T, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut retries = 0u32;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let kind = classify::classify(&e);
                let unit = rand::thread_rng().gen_range(-1.0..=1.0);
                match policy.decide(retries, kind, unit) {
                    RetryDecision::NoRetry => {
                        return Err(match kind {
                            super::policy::ErrorKind::Throttled => CallError::Exhausted {
                                attempts: retries + 1,
                                last: e,
                            },
                            super::policy::ErrorKind::Fatal => CallError::Fatal(e),
                        });
                    }
                    RetryDecision::RetryAfter(delay) => {
                        retries += 1;
                        observer.on_retry(&e, delay, retries, policy.max_retries);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
