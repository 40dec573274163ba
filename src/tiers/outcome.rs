//! Per-tier diagnostics.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How one tier fared in one resolver invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierStatus {
    Succeeded,
    Failed,
    NotFound,
    TimedOut,
    /// Not configured; never contacted.
    Skipped,
}

impl TierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierStatus::Succeeded => "succeeded",
            TierStatus::Failed => "failed",
            TierStatus::NotFound => "not_found",
            TierStatus::TimedOut => "timed_out",
            TierStatus::Skipped => "skipped",
        }
    }
}

/// Outcome record for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackOutcome {
    pub tier: String,
    pub status: TierStatus,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FallbackOutcome {
    pub fn new(tier: impl Into<String>, status: TierStatus, latency: Duration, error: Option<String>) -> Self {
        Self {
            tier: tier.into(),
            status,
            latency_ms: latency.as_millis() as u64,
            error,
        }
    }

    pub fn skipped(tier: impl Into<String>) -> Self {
        Self::new(tier, TierStatus::Skipped, Duration::ZERO, None)
    }

    pub fn succeeded(&self) -> bool {
        self.status == TierStatus::Succeeded
    }

    pub fn attempted(&self) -> bool {
        self.status != TierStatus::Skipped
    }
}
