//! Typed remote-call errors for retry classification.

use thiserror::Error;

/// Error surfaced by a single remote call (Cognito listing, S3 upload).
///
/// Carries the service's error code so the retry layer can classify it
/// without downcasting SDK error types.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct ServiceError {
    /// Service error code (e.g. `ThrottlingException`, `NotAuthorizedException`).
    pub code: String,
    /// Human-readable message from the service.
    pub message: String,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Terminal outcome of a retried call.
#[derive(Debug, Error)]
pub enum CallError {
    /// Retry budget consumed while still throttled; carries the last cause.
    #[error("retries exhausted after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: ServiceError },
    /// Non-retryable failure, surfaced immediately.
    #[error(transparent)]
    Fatal(ServiceError),
}

impl CallError {
    /// The underlying service error, whichever way the call ended.
    pub fn cause(&self) -> &ServiceError {
        match self {
            CallError::Exhausted { last, .. } => last,
            CallError::Fatal(e) => e,
        }
    }
}
