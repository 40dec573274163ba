//! Client error types and reply classification.

use serde_json::Value;
use thiserror::Error;

use crate::auth::AuthError;
use crate::resilience::{Fetched, RetryError, Retryable};
use crate::tiers::FallbackOutcome;

/// Why one attempt against the pipeline failed.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    #[error("network error: {0}")]
    Transient(String),

    #[error("request timed out")]
    Timeout,

    #[error("authentication rejected (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("pipeline degraded (HTTP {status}): {message}")]
    Upstream {
        status: u16,
        message: String,
        outcomes: Vec<FallbackOutcome>,
    },

    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("could not sign request: {0}")]
    Signing(#[from] AuthError),
}

impl Retryable for AttemptError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            AttemptError::Transient(_) | AttemptError::Timeout | AttemptError::Upstream { .. }
        )
    }

    fn is_timeout(&self) -> bool {
        matches!(self, AttemptError::Timeout)
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AttemptError::Timeout
        } else if e.is_decode() {
            AttemptError::Malformed(e.to_string())
        } else {
            AttemptError::Transient(e.to_string())
        }
    }
}

/// Terminal client failure.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid pipeline URL '{0}'")]
    InvalidUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),

    #[error("no admin key configured")]
    MissingAdminKey,

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Retry(#[from] RetryError<AttemptError>),

    #[error("admin request failed: {0}")]
    Admin(AttemptError),
}

impl ClientError {
    /// Per-tier trail reported by the server for the last failed attempt.
    pub fn outcomes(&self) -> &[FallbackOutcome] {
        let last = match self {
            ClientError::Retry(e) => e.last_error(),
            ClientError::Admin(e) => Some(e),
            _ => None,
        };
        match last {
            Some(AttemptError::Upstream { outcomes, .. }) => outcomes.as_slice(),
            _ => &[],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Retry(RetryError::Cancelled { .. }))
    }
}

fn error_message(body: &Value, fallback: &str) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

/// Classify one pipeline reply.
///
/// 2xx is found (`data` unwrapped), 404 is not found, 401/403 is terminal,
/// 408/429/5xx are retryable, anything else is terminal.
pub fn classify_reply(status: u16, body: &[u8]) -> Result<Fetched<Value>, AttemptError> {
    let json = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(json) => json,
            Err(_) if !(200..300).contains(&status) => Value::Null,
            Err(e) => return Err(AttemptError::Malformed(e.to_string())),
        }
    };

    match status {
        200..=299 => Ok(Fetched::Found(match json {
            Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
            other => other,
        })),
        404 => Ok(Fetched::NotFound),
        401 | 403 => Err(AttemptError::Authentication {
            status,
            message: error_message(&json, "unauthorized"),
        }),
        408 => Err(AttemptError::Timeout),
        429 => Err(AttemptError::Transient(error_message(&json, "rate limited"))),
        500..=599 => Err(AttemptError::Upstream {
            status,
            message: error_message(&json, "server error"),
            outcomes: json
                .get("outcomes")
                .cloned()
                .and_then(|o| serde_json::from_value(o).ok())
                .unwrap_or_default(),
        }),
        _ => Err(AttemptError::Rejected {
            status,
            message: error_message(&json, "unexpected status"),
        }),
    }
}
