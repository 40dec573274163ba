use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use ring::hmac;

use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.config.admin.api_key.as_deref() else {
        return Err(StatusCode::NOT_FOUND);
    };

    if bearer_matches(request.headers(), expected) {
        return Ok(next.run(request).await);
    }

    metrics::record_auth_rejection("admin_key");
    tracing::warn!(path = %request.uri().path(), "Rejected admin request");
    Err(StatusCode::UNAUTHORIZED)
}

/// Whether the `Authorization: Bearer` token equals `expected`.
/// Compared as HMAC tags through `hmac::verify`, in constant time.
fn bearer_matches(headers: &HeaderMap, expected: &str) -> bool {
    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return false;
    };

    let key = hmac::Key::new(hmac::HMAC_SHA256, expected.as_bytes());
    let tag = hmac::sign(&key, expected.as_bytes());
    hmac::verify(&key, token.as_bytes(), tag.as_ref()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    #[test]
    fn test_matching_bearer_token() {
        assert!(bearer_matches(&headers("Bearer admin-key"), "admin-key"));
    }

    #[test]
    fn test_wrong_or_partial_token_rejected() {
        assert!(!bearer_matches(&headers("Bearer admin-kez"), "admin-key"));
        assert!(!bearer_matches(&headers("Bearer admin"), "admin-key"));
        assert!(!bearer_matches(&headers("Bearer admin-key-extra"), "admin-key"));
        assert!(!bearer_matches(&headers("Bearer "), "admin-key"));
    }

    #[test]
    fn test_missing_header_or_other_scheme_rejected() {
        assert!(!bearer_matches(&HeaderMap::new(), "admin-key"));
        assert!(!bearer_matches(&headers("Basic admin-key"), "admin-key"));
        assert!(!bearer_matches(&headers("admin-key"), "admin-key"));
    }
}
