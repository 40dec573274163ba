//! Pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Operation (retrieve settings | report progress)
//!     → operation.rs (validate, build TierRequest)
//!     → controller.rs (resolver call, NotFound mapping, serving tier logged)
//!     → Fetched<Value> | PipelineError
//!
//! report progress, every tier failed
//!     → queue.rs (bounded, drop-oldest)
//!     → controller.flush_pending (FIFO, stops at first failure)
//! ```
//!
//! # Design Decisions
//! - The controller is the only place that learns which tier answered
//! - "Not found" from any attempted tier is an answer, not a failure
//! - The pending queue is owned by the controller instance, never global

pub mod controller;
pub mod operation;
pub mod queue;

use thiserror::Error;

use crate::auth::AuthError;
use crate::tiers::{AllTiersFailed, DescriptorError, TransportError};

pub use controller::{CallContext, FlushSummary, PipelineController};
pub use operation::{Operation, ProgressReport};
pub use queue::{PendingEntry, PendingQueue};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    AllTiersFailed(#[from] AllTiersFailed),

    #[error("operation cancelled")]
    Cancelled,

    #[error("signing unavailable: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
}
