use std::time::Duration;

/// High-level classification of a remote error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Service asked us to slow down (throttling / quota exceeded).
    Throttled,
    /// Any other failure (auth, malformed request, not-found). Not retried.
    Fatal,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with a cap and symmetric jitter.
///
/// `jitter` is a fraction of the computed delay; the random unit in
/// `[-1, 1]` is supplied by the caller so tests stay deterministic.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
    /// Jitter fraction in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 8,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Compute the backoff delay for a given attempt (0-based).
    ///
    /// `jitter_unit` must lie in `[-1, 1]`. Attempts large enough that
    /// `2^attempt` would overflow clamp to `max_delay` before jitter is
    /// applied; the result never goes negative or above `max_delay`.
    pub fn delay_for(&self, attempt: u32, jitter_unit: f64) -> Duration {
        // Exponent is capped so the multiplication stays finite; min()
        // then clamps the result to max_delay.
        let exp = 2f64.powi(attempt.min(63) as i32);
        let base = (self.base_delay.as_secs_f64() * exp).min(self.max_delay.as_secs_f64());
        let jittered = base + jitter_unit * self.jitter * base;
        Duration::from_secs_f64(jittered.clamp(0.0, self.max_delay.as_secs_f64()))
    }

    /// Decide whether to retry after `retries_so_far` failed retries.
    pub fn decide(&self, retries_so_far: u32, kind: ErrorKind, jitter_unit: f64) -> RetryDecision {
        match kind {
            ErrorKind::Fatal => RetryDecision::NoRetry,
            ErrorKind::Throttled => {
                if retries_so_far >= self.max_retries {
                    RetryDecision::NoRetry
                } else {
                    RetryDecision::RetryAfter(self.delay_for(retries_so_far, jitter_unit))
                }
            }
        }
    }
}
