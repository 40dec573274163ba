//! Inbound signature verification for axum routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::headers::SignedHeaders;
use crate::auth::signer::{unix_now, Signer};
use crate::auth::AuthError;
use crate::observability::metrics;

/// Verifies that an inbound request was signed by a known caller.
#[derive(Debug, Clone)]
pub struct InboundVerifier {
    signer: Signer,
    caller_key: String,
    body_limit: usize,
}

impl InboundVerifier {
    pub fn new(signer: Signer, caller_key: impl Into<String>, body_limit: usize) -> Self {
        Self {
            signer,
            caller_key: caller_key.into(),
            body_limit,
        }
    }

    /// Check headers and body against the current clock.
    pub fn check(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthError> {
        self.check_at(headers, body, unix_now())
    }

    pub fn check_at(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), AuthError> {
        let signed = SignedHeaders::from_headers(headers)?;
        if signed.caller_key != self.caller_key {
            return Err(AuthError::UnknownCaller);
        }
        self.signer.verify_at(body, &signed.signature, signed.timestamp, now)
    }
}

/// Middleware that buffers the body, verifies it, and hands the request on.
pub async fn verify_signed_request(
    State(verifier): State<Arc<InboundVerifier>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, verifier.body_limit).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": "request body too large" })),
            )
                .into_response();
        }
    };

    if let Err(e) = verifier.check(&parts.headers, &bytes) {
        metrics::record_auth_rejection(e.reason());
        tracing::warn!(
            path = %parts.uri.path(),
            reason = e.reason(),
            "Rejected unauthenticated request"
        );
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": e.to_string() }))).into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
