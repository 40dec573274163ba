//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Client call:
//!     → retries.rs (RetrySession drives attempts, stuck signal, hooks)
//!     → backoff.rs (delay between attempts)
//!     → cancel.rs (caller aborts in-flight I/O and further retries)
//!
//! Tier call:
//!     → timeouts.rs (per-tier deadline, cancellation)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retry budget is bounded by max attempts, never by wall clock alone
//! - Sessions hold no global state; one per logical call

pub mod backoff;
pub mod cancel;
pub mod retries;
pub mod timeouts;

pub use backoff::Backoff;
pub use cancel::CancelToken;
pub use retries::{
    AttemptOutcome, Fetched, NoopObserver, RequestAttempt, RetryError, RetryObserver, RetryPolicy,
    RetrySession, Retryable, SessionState, TracingObserver,
};
pub use timeouts::{bounded, Bounded};
