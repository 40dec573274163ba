//! Signed-request header codec.

use axum::http::{HeaderMap, HeaderValue};

use crate::auth::signer::SignedEnvelope;
use crate::auth::AuthError;

pub const SIGNATURE_HEADER: &str = "x-tierline-signature";
pub const TIMESTAMP_HEADER: &str = "x-tierline-timestamp";
pub const KEY_HEADER: &str = "x-tierline-key";

/// The three authentication headers carried by a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub caller_key: String,
    pub timestamp: i64,
    pub signature: String,
}

impl SignedHeaders {
    pub fn from_envelope(envelope: &SignedEnvelope, caller_key: &str) -> Self {
        Self {
            caller_key: caller_key.to_string(),
            timestamp: envelope.timestamp,
            signature: envelope.signature.clone(),
        }
    }

    /// Insert the headers into `headers`, replacing existing values.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        let key = HeaderValue::from_str(&self.caller_key)
            .map_err(|_| AuthError::MalformedHeader(KEY_HEADER))?;
        let signature = HeaderValue::from_str(&self.signature)
            .map_err(|_| AuthError::MalformedHeader(SIGNATURE_HEADER))?;

        headers.insert(KEY_HEADER, key);
        headers.insert(SIGNATURE_HEADER, signature);
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from(self.timestamp));
        Ok(())
    }

    pub fn to_header_map(&self) -> Result<HeaderMap, AuthError> {
        let mut headers = HeaderMap::new();
        self.apply(&mut headers)?;
        Ok(headers)
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let caller_key = required(headers, KEY_HEADER)?;
        let signature = required(headers, SIGNATURE_HEADER)?;
        let timestamp = required(headers, TIMESTAMP_HEADER)?
            .trim()
            .parse()
            .map_err(|_| AuthError::MalformedHeader(TIMESTAMP_HEADER))?;

        Ok(Self {
            caller_key: caller_key.to_string(),
            timestamp,
            signature: signature.to_string(),
        })
    }
}

fn required<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AuthError> {
    headers
        .get(name)
        .ok_or(AuthError::MissingHeader(name))?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader(name))
}
