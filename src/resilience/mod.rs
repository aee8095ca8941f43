//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Readiness wait (shared config):
//!     → retries.rs poll_until (fixed interval, bounded attempts)
//!
//! Startup RPC connect:
//!     → retries.rs retry_with (exponential schedule)
//!     → backoff.rs (jittered delay)
//! ```
//!
//! # Design Decisions
//! - Every wait is bounded; exhaustion is a terminal, typed signal
//! - Cancellation is by dropping the future, so no shared flags

pub mod backoff;
pub mod retries;

pub use retries::{poll_until, retry_with, RetryError, RetryPolicy, Schedule};
