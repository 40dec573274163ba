//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pipeline.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so a minimal file (or none at all, with
//! environment overrides) is enough to start.

use serde::{Deserialize, Serialize};

/// Root configuration for the pipeline server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Backend tiers, in fallback order. The first entry is authoritative.
    pub tiers: Vec<TierConfig>,

    /// Request signing and inbound verification.
    pub signing: SigningConfig,

    /// Retry tuning used by clients of the pipeline.
    pub retries: RetryConfig,

    /// Pending progress-report queue.
    pub queue: QueueConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoints.
    pub admin: AdminConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            tiers: default_tiers(),
            signing: SigningConfig::default(),
            retries: RetryConfig::default(),
            queue: QueueConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,

    /// Overall deadline for one inbound request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// How a tier authenticates our calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierAuthKind {
    /// No credentials are sent.
    None,
    /// `Authorization: Bearer <api_key>`.
    Bearer,
    /// `apikey: <api_key>` plus the same key as a bearer token.
    ApiKey,
    /// HMAC-signed envelope headers.
    Signed,
}

impl TierAuthKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierAuthKind::None => "none",
            TierAuthKind::Bearer => "bearer",
            TierAuthKind::ApiKey => "api_key",
            TierAuthKind::Signed => "signed",
        }
    }
}

/// One backend tier.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TierConfig {
    /// Unique tier identifier, also used for env overrides (`TIERLINE_<NAME>_URL`).
    pub name: String,

    /// Base URL. A tier without one is skipped.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-call timeout in milliseconds.
    #[serde(default = "default_tier_timeout_ms")]
    pub timeout_ms: u64,

    /// Authentication style.
    #[serde(default = "default_tier_auth")]
    pub auth: TierAuthKind,

    /// API key for `bearer` and `api_key` tiers.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-tier signing secret for `signed` tiers. Falls back to the shared secret.
    #[serde(default)]
    pub secret: Option<String>,

    /// Whether the tier is unusable without credentials. Defaults to true for
    /// every auth style except `none`.
    #[serde(default)]
    pub requires_credentials: Option<bool>,
}

impl TierConfig {
    pub fn new(name: impl Into<String>, auth: TierAuthKind) -> Self {
        Self {
            name: name.into(),
            base_url: None,
            timeout_ms: default_tier_timeout_ms(),
            auth,
            api_key: None,
            secret: None,
            requires_credentials: None,
        }
    }
}

fn default_tier_timeout_ms() -> u64 {
    5_000
}

fn default_tier_auth() -> TierAuthKind {
    TierAuthKind::Bearer
}

/// The three standard tiers: remote control service, workflow automation,
/// persistent store. None has a URL until configured.
pub fn default_tiers() -> Vec<TierConfig> {
    vec![
        TierConfig::new("control", TierAuthKind::Bearer),
        TierConfig {
            timeout_ms: 10_000,
            ..TierConfig::new("workflow", TierAuthKind::Signed)
        },
        TierConfig::new("store", TierAuthKind::ApiKey),
    ]
}

/// Which bytes the request MAC covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignatureScheme {
    /// MAC over `body ++ "." ++ timestamp`.
    #[default]
    BodyAndTimestamp,
    /// MAC over the body only; the timestamp travels unsigned.
    BodyOnly,
}

/// Request signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Shared HMAC secret. Required: the server refuses to start without it.
    pub secret: Option<String>,

    /// Caller-identifying key sent in `x-tierline-key` and expected inbound.
    pub caller_key: String,

    /// Accepted clock skew in seconds.
    pub tolerance_secs: u64,

    pub scheme: SignatureScheme,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            secret: None,
            caller_key: "tierline".to_string(),
            tolerance_secs: 300,
            scheme: SignatureScheme::default(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Consecutive failures before a request is flagged as stuck.
    pub warn_after: u32,

    /// Delay after the first failure in milliseconds.
    pub initial_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Growth factor between delays.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            warn_after: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 16_000,
            multiplier: 2.0,
        }
    }
}

/// Pending-report queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum queued reports; the oldest is evicted beyond this.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "tierline=info,tower_http=info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token for `/admin/*`. Admin routes are not mounted without one.
    pub api_key: Option<String>,
}
