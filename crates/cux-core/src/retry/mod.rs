//! Retry and backoff policy.
//!
//! This module encapsulates error classification (throttling vs. fatal)
//! and exponential backoff decisions so that higher layers (pager,
//! exporter, uploader) can share a consistent policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, is_throttling_code};
pub use error::{CallError, ServiceError};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, NullObserver, RetryObserver, TracingObserver};
