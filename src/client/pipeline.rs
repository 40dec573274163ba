//! Signed, retrying HTTP client for the pipeline server.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, Method};
use serde_json::Value;
use url::Url;

use crate::auth::{SignedHeaders, Signer};
use crate::client::error::{classify_reply, AttemptError, ClientError};
use crate::pipeline::ProgressReport;
use crate::resilience::{CancelToken, Fetched, RetryObserver, RetryPolicy, RetrySession, TracingObserver};

/// Client for the `/api/v1` and `/admin` surfaces.
pub struct PipelineClient {
    http: reqwest::Client,
    base_url: Url,
    caller_key: String,
    signer: Signer,
    policy: RetryPolicy,
    observer: Option<Arc<dyn RetryObserver>>,
    admin_key: Option<String>,
    attempt_timeout: Duration,
}

impl std::fmt::Debug for PipelineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineClient")
            .field("base_url", &self.base_url.as_str())
            .field("caller_key", &self.caller_key)
            .field("policy", &self.policy)
            .finish()
    }
}

impl PipelineClient {
    pub fn new(base_url: &str, caller_key: impl Into<String>, signer: Signer) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|_| ClientError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("tierline-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            caller_key: caller_key.into(),
            signer,
            policy: RetryPolicy::default(),
            observer: None,
            admin_key: None,
            attempt_timeout: Duration::from_secs(30),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the default `tracing` observer.
    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_admin_key(mut self, admin_key: Option<String>) -> Self {
        self.admin_key = admin_key;
        self
    }

    /// Deadline for a single attempt.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub async fn retrieve_settings(&self, key: &str, cancel: &CancelToken) -> Result<Fetched<Value>, ClientError> {
        let url = self.url(&["api", "v1", "settings", key])?;
        self.call("retrieve_settings", Method::GET, url, Bytes::new(), cancel)
            .await
    }

    pub async fn report_progress(&self, report: &ProgressReport, cancel: &CancelToken) -> Result<Fetched<Value>, ClientError> {
        let url = self.url(&["api", "v1", "tasks", report.task_id.as_str(), "progress"])?;
        let body = serde_json::to_vec(report)?;
        self.call("report_progress", Method::POST, url, Bytes::from(body), cancel)
            .await
    }

    pub async fn admin_status(&self) -> Result<Value, ClientError> {
        self.admin(Method::GET, "status").await
    }

    pub async fn admin_tiers(&self) -> Result<Value, ClientError> {
        self.admin(Method::GET, "tiers").await
    }

    pub async fn admin_flush(&self) -> Result<Value, ClientError> {
        self.admin(Method::POST, "flush").await
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Bytes,
        cancel: &CancelToken,
    ) -> Result<Fetched<Value>, ClientError> {
        let observer = self
            .observer
            .clone()
            .unwrap_or_else(|| Arc::new(TracingObserver::new(operation)));

        let session = RetrySession::new(self.policy)
            .with_observer(observer)
            .with_cancel(cancel.clone());

        let result = session
            .run(|attempt| {
                tracing::debug!(operation, attempt, url = %url, "Sending pipeline request");
                self.attempt(method.clone(), url.clone(), body.clone())
            })
            .await?;
        Ok(result)
    }

    /// One signed round trip. The signature is fresh for every attempt.
    async fn attempt(&self, method: Method, url: Url, body: Bytes) -> Result<Fetched<Value>, AttemptError> {
        let envelope = self.signer.seal(body);
        let headers = SignedHeaders::from_envelope(&envelope, &self.caller_key).to_header_map()?;

        let mut request = self
            .http
            .request(method, url)
            .headers(headers)
            .timeout(self.attempt_timeout);
        if !envelope.body.is_empty() {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(envelope.body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        classify_reply(status, &bytes)
    }

    async fn admin(&self, method: Method, endpoint: &str) -> Result<Value, ClientError> {
        let key = self.admin_key.as_deref().ok_or(ClientError::MissingAdminKey)?;
        let url = self.url(&["admin", endpoint])?;

        let response = self
            .http
            .request(method, url)
            .bearer_auth(key)
            .timeout(self.attempt_timeout)
            .send()
            .await
            .map_err(|e| ClientError::Admin(e.into()))?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| ClientError::Admin(e.into()))?;

        match classify_reply(status, &bytes) {
            Ok(Fetched::Found(value)) => Ok(value),
            Ok(Fetched::NotFound) => Err(ClientError::Admin(AttemptError::Rejected {
                status,
                message: "admin routes are not enabled".into(),
            })),
            Err(e) => Err(ClientError::Admin(e)),
        }
    }
}
