//! Classify service error codes into retry policy error kinds.

use crate::retry::error::ServiceError;
use crate::retry::policy::ErrorKind;

/// Error codes Cognito and S3 use to signal rate limiting.
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "TooManyRequestsException",
    "Throttling",
    "LimitExceededException",
];

/// True if the given service error code is a throttling signal.
pub fn is_throttling_code(code: &str) -> bool {
    THROTTLING_CODES.contains(&code)
}

/// Classify a service error into an ErrorKind.
pub fn classify(e: &ServiceError) -> ErrorKind {
    if is_throttling_code(&e.code) {
        ErrorKind::Throttled
    } else {
        ErrorKind::Fatal
    }
}
