//! Backend tier subsystem.
//!
//! # Data Flow
//! ```text
//! [[tiers]] config
//!     → descriptor.rs (validated, immutable TierTable behind Arc)
//!
//! TierRequest
//!     → resolver.rs (tier 1 → tier 2 → tier 3, each time-boxed)
//!     → transport.rs (HTTP + per-tier auth, x-request-id)
//!     → outcome.rs (one FallbackOutcome per tier)
//!     → Resolved | AllTiersFailed
//! ```
//!
//! # Design Decisions
//! - At most one tier call is in flight per resolution
//! - A tier timeout only affects that tier; the resolver moves on
//! - Unconfigured tiers cost nothing and are reported as skipped

pub mod descriptor;
pub mod outcome;
pub mod resolver;
pub mod transport;

pub use descriptor::{build_tier_table, Credentials, DescriptorError, TierDescriptor, TierTable};
pub use outcome::{FallbackOutcome, TierStatus};
pub use resolver::{AllTiersFailed, ResolveError, Resolved, TierResolver};
pub use transport::{HttpTransport, TierReply, TierRequest, TierTransport, TransportError};
