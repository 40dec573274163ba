//! Request authentication subsystem.
//!
//! # Data Flow
//! ```text
//! outbound: body → signer.rs (HMAC-SHA256 + timestamp) → headers.rs → tier / server
//! inbound:  request → middleware.rs (buffer body, read headers)
//!     → caller key check → timestamp window → MAC check (constant time)
//!     → handler, or 401
//! ```
//!
//! # Design Decisions
//! - Fail closed: no secret, no signer; the server refuses to start
//! - Every check runs on its own and any one of them rejects the request
//! - The MAC covers the timestamp by default; `body_only` exists for legacy peers

pub mod headers;
pub mod middleware;
pub mod signer;

use thiserror::Error;

pub use crate::config::schema::SignatureScheme;
pub use headers::{SignedHeaders, KEY_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
pub use middleware::{verify_signed_request, InboundVerifier};
pub use signer::{sign, unix_now, verify, verify_at, SignedEnvelope, Signer, SigningSecret};

/// Why a request could not be signed or was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("signing secret is not configured")]
    MissingSecret,

    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("malformed {0} header")]
    MalformedHeader(&'static str),

    #[error("unknown caller key")]
    UnknownCaller,

    #[error("timestamp outside tolerance window ({skew_secs}s skew)")]
    StaleTimestamp { skew_secs: u64 },

    #[error("signature mismatch")]
    BadSignature,
}

impl AuthError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingSecret => "missing_secret",
            AuthError::MissingHeader(_) => "missing_header",
            AuthError::MalformedHeader(_) => "malformed_header",
            AuthError::UnknownCaller => "unknown_caller",
            AuthError::StaleTimestamp { .. } => "stale_timestamp",
            AuthError::BadSignature => "bad_signature",
        }
    }
}
