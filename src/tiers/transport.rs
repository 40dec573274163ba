//! Tier transport abstraction.
//!
//! The resolver talks to tiers only through [`TierTransport`], so tests can
//! script tier behaviour without sockets and the HTTP details stay here.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use thiserror::Error;

use crate::auth::{AuthError, SignedHeaders};
use crate::config::schema::TierAuthKind;
use crate::http::request::X_REQUEST_ID;
use crate::tiers::descriptor::{Credentials, TierDescriptor};

/// A request sent to each tier in turn.
#[derive(Debug, Clone)]
pub struct TierRequest {
    pub method: Method,
    /// Path segments appended to the tier's base URL (unencoded).
    pub segments: Vec<String>,
    pub body: Option<Bytes>,
    pub request_id: Option<String>,
}

impl TierRequest {
    pub fn get<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self {
            method: Method::GET,
            segments: segments.into_iter().map(Into::into).collect(),
            body: None,
            request_id: None,
        }
    }

    pub fn post_json<S: Into<String>>(segments: impl IntoIterator<Item = S>, body: Bytes) -> Self {
        Self {
            method: Method::POST,
            segments: segments.into_iter().map(Into::into).collect(),
            body: Some(body),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// `/`-joined path, for logs.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// Raw reply from one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierReply {
    pub status: u16,
    pub body: Bytes,
}

impl TierReply {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON. An empty body is `null`.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&self.body)
    }
}

/// Failure to get any reply from a tier.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("tier has no usable endpoint for {0}")]
    Endpoint(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("signing failed: {0}")]
    Auth(#[from] AuthError),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Sends one request to one tier. Deadlines are applied by the caller.
#[async_trait]
pub trait TierTransport: Send + Sync {
    async fn send(&self, tier: &TierDescriptor, request: &TierRequest) -> Result<TierReply, TransportError>;
}

/// HTTP transport backed by a shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    caller_key: String,
}

impl HttpTransport {
    pub fn new(caller_key: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tierline/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            caller_key: caller_key.into(),
        })
    }
}

#[async_trait]
impl TierTransport for HttpTransport {
    async fn send(&self, tier: &TierDescriptor, request: &TierRequest) -> Result<TierReply, TransportError> {
        let url = tier
            .endpoint(&request.segments)
            .ok_or_else(|| TransportError::Endpoint(request.path()))?;

        let mut builder = self.client.request(request.method.clone(), url);

        if let Some(request_id) = &request.request_id {
            builder = builder.header(X_REQUEST_ID, request_id);
        }

        builder = match &tier.credentials {
            Credentials::None => builder,
            Credentials::ApiKey(key) if tier.auth == TierAuthKind::ApiKey => {
                builder.header("apikey", key).bearer_auth(key)
            }
            Credentials::ApiKey(key) => builder.bearer_auth(key),
            Credentials::Signing(signer) => {
                let body = request.body.clone().unwrap_or_default();
                let envelope = signer.seal(body);
                let headers = SignedHeaders::from_envelope(&envelope, &self.caller_key).to_header_map()?;
                builder.headers(headers)
            }
        };

        if let Some(body) = &request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(TierReply { status, body })
    }
}
