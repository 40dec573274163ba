//! Pipeline client subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → pipeline.rs (RetrySession per logical call)
//!     → sign body + timestamp afresh per attempt
//!     → HTTP round trip to the pipeline server
//!     → error.rs (classify: found / not found / retryable / terminal)
//! ```
//!
//! # Design Decisions
//! - The whole round trip is retried, never a single tier
//! - Authentication failures end the session on the first occurrence
//! - Admin calls are single-shot; they are operator actions

pub mod error;
pub mod pipeline;

pub use error::{classify_reply, AttemptError, ClientError};
pub use pipeline::PipelineClient;
