//! HMAC-SHA256 request signing and verification.
//!
//! A signature is the lowercase hex HMAC-SHA256 of the signed bytes:
//! - `body_and_timestamp`: `body ++ "." ++ decimal(timestamp)` (default)
//! - `body_only`: `body`
//!
//! Verification always checks the timestamp window as well, whatever the
//! scheme, and compares MACs in constant time.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use ring::hmac;

use crate::auth::AuthError;
use crate::config::schema::{SignatureScheme, SigningConfig};

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// A non-empty HMAC key. Never printed.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, AuthError> {
        let secret = secret.as_ref();
        if secret.iter().all(u8::is_ascii_whitespace) {
            return Err(AuthError::MissingSecret);
        }
        Ok(Self(secret.to_vec()))
    }

    fn key(&self) -> hmac::Key {
        hmac::Key::new(hmac::HMAC_SHA256, &self.0)
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// A body with its signature and the timestamp it was signed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub body: Bytes,
    pub timestamp: i64,
    pub signature: String,
}

fn mac_input(ctx: &mut hmac::Context, body: &[u8], timestamp: i64, scheme: SignatureScheme) {
    ctx.update(body);
    if scheme == SignatureScheme::BodyAndTimestamp {
        ctx.update(b".");
        ctx.update(timestamp.to_string().as_bytes());
    }
}

/// Sign `body` at `timestamp` with `secret`.
pub fn sign(body: &[u8], secret: &SigningSecret, timestamp: i64, scheme: SignatureScheme) -> String {
    let mut ctx = hmac::Context::with_key(&secret.key());
    mac_input(&mut ctx, body, timestamp, scheme);
    hex::encode(ctx.sign().as_ref())
}

/// Check a signature and its timestamp against `now`.
pub fn verify_at(
    body: &[u8],
    signature: &str,
    secret: &SigningSecret,
    timestamp: i64,
    tolerance: Duration,
    scheme: SignatureScheme,
    now: i64,
) -> Result<(), AuthError> {
    let skew = now.abs_diff(timestamp);
    if skew > tolerance.as_secs() {
        return Err(AuthError::StaleTimestamp { skew_secs: skew });
    }

    let tag = hex::decode(signature.trim()).map_err(|_| AuthError::BadSignature)?;

    let mut signed = Vec::with_capacity(body.len() + 21);
    signed.extend_from_slice(body);
    if scheme == SignatureScheme::BodyAndTimestamp {
        signed.push(b'.');
        signed.extend_from_slice(timestamp.to_string().as_bytes());
    }

    hmac::verify(&secret.key(), &signed, &tag).map_err(|_| AuthError::BadSignature)
}

/// Boolean form of [`verify_at`] against the current clock.
pub fn verify(
    body: &[u8],
    signature: &str,
    secret: &SigningSecret,
    timestamp: i64,
    tolerance: Duration,
    scheme: SignatureScheme,
) -> bool {
    verify_at(body, signature, secret, timestamp, tolerance, scheme, unix_now()).is_ok()
}

/// Signing key plus the policy it is used under.
#[derive(Debug, Clone)]
pub struct Signer {
    secret: SigningSecret,
    scheme: SignatureScheme,
    tolerance: Duration,
}

impl Signer {
    pub fn new(secret: SigningSecret, scheme: SignatureScheme, tolerance: Duration) -> Self {
        Self { secret, scheme, tolerance }
    }

    /// Build from config, failing closed when no secret is configured.
    pub fn from_config(config: &SigningConfig) -> Result<Self, AuthError> {
        let secret = config.secret.as_deref().ok_or(AuthError::MissingSecret)?;
        Ok(Self::new(
            SigningSecret::new(secret)?,
            config.scheme,
            Duration::from_secs(config.tolerance_secs),
        ))
    }

    /// Same policy, different key.
    pub fn with_secret(&self, secret: SigningSecret) -> Self {
        Self { secret, ..self.clone() }
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    pub fn sign(&self, body: &[u8], timestamp: i64) -> String {
        sign(body, &self.secret, timestamp, self.scheme)
    }

    /// Sign `body` at the current time.
    pub fn seal(&self, body: impl Into<Bytes>) -> SignedEnvelope {
        self.seal_at(body, unix_now())
    }

    pub fn seal_at(&self, body: impl Into<Bytes>, timestamp: i64) -> SignedEnvelope {
        let body = body.into();
        let signature = self.sign(&body, timestamp);
        SignedEnvelope { body, timestamp, signature }
    }

    pub fn verify_at(&self, body: &[u8], signature: &str, timestamp: i64, now: i64) -> Result<(), AuthError> {
        verify_at(body, signature, &self.secret, timestamp, self.tolerance, self.scheme, now)
    }

    pub fn open(&self, envelope: &SignedEnvelope) -> Result<(), AuthError> {
        self.verify_at(&envelope.body, &envelope.signature, envelope.timestamp, unix_now())
    }
}
