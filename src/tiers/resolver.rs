//! Cascading tier resolver.
//!
//! Tiers are tried strictly in table order, one call at a time, each under its
//! own deadline. The first 2xx reply with an empty or JSON body wins; every
//! other reply, error, or timeout moves on to the next tier. Unconfigured
//! tiers are recorded as skipped and never contacted.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::observability::metrics;
use crate::resilience::cancel::CancelToken;
use crate::resilience::timeouts::{bounded, Bounded};
use crate::tiers::descriptor::{TierDescriptor, TierTable};
use crate::tiers::outcome::{FallbackOutcome, TierStatus};
use crate::tiers::transport::{TierReply, TierRequest, TierTransport};

/// Every tier was skipped or failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("all tiers failed ({} attempted, {} skipped)", attempted_count(.outcomes), .outcomes.len() - attempted_count(.outcomes))]
pub struct AllTiersFailed {
    pub outcomes: Vec<FallbackOutcome>,
}

fn attempted_count(outcomes: &[FallbackOutcome]) -> usize {
    outcomes.iter().filter(|o| o.attempted()).count()
}

impl AllTiersFailed {
    /// Number of tiers actually contacted.
    pub fn attempted(&self) -> usize {
        attempted_count(&self.outcomes)
    }

    pub fn any_not_found(&self) -> bool {
        self.outcomes.iter().any(|o| o.status == TierStatus::NotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    AllTiersFailed(#[from] AllTiersFailed),

    #[error("resolution cancelled")]
    Cancelled,
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Name of the serving tier.
    pub tier: String,
    pub reply: TierReply,
    pub value: serde_json::Value,
    pub outcomes: Vec<FallbackOutcome>,
}

/// Sequential fallback over a shared tier table.
#[derive(Clone)]
pub struct TierResolver {
    tiers: TierTable,
    transport: Arc<dyn TierTransport>,
}

impl std::fmt::Debug for TierResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierResolver").field("tiers", &self.tiers).finish()
    }
}

impl TierResolver {
    pub fn new(tiers: TierTable, transport: Arc<dyn TierTransport>) -> Self {
        Self { tiers, transport }
    }

    pub fn tiers(&self) -> &[TierDescriptor] {
        &self.tiers
    }

    pub async fn resolve(&self, request: &TierRequest, cancel: &CancelToken) -> Result<Resolved, ResolveError> {
        let mut outcomes = Vec::with_capacity(self.tiers.len());

        for tier in self.tiers.iter() {
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            if !tier.is_configured() {
                tracing::debug!(tier = %tier.name, "Tier not configured, skipping");
                outcomes.push(FallbackOutcome::skipped(&tier.name));
                continue;
            }

            let started = Instant::now();
            let result = bounded(Some(tier.timeout), cancel, self.transport.send(tier, request)).await;
            let latency = started.elapsed();

            let (status, error) = match result {
                Bounded::Cancelled => return Err(ResolveError::Cancelled),
                Bounded::TimedOut => (
                    TierStatus::TimedOut,
                    format!("timed out after {}ms", tier.timeout.as_millis()),
                ),
                Bounded::Completed(Err(e)) => (TierStatus::Failed, e.to_string()),
                Bounded::Completed(Ok(reply)) if reply.status == 404 => {
                    (TierStatus::NotFound, "HTTP 404".to_string())
                }
                Bounded::Completed(Ok(reply)) if !reply.is_success() => {
                    (TierStatus::Failed, format!("HTTP {}", reply.status))
                }
                Bounded::Completed(Ok(reply)) => match reply.json() {
                    Ok(value) => {
                        metrics::record_tier_attempt(&tier.name, TierStatus::Succeeded.as_str(), latency);
                        outcomes.push(FallbackOutcome::new(&tier.name, TierStatus::Succeeded, latency, None));
                        return Ok(Resolved {
                            tier: tier.name.clone(),
                            reply,
                            value,
                            outcomes,
                        });
                    }
                    Err(e) => (TierStatus::Failed, format!("malformed body: {}", e)),
                },
            };

            metrics::record_tier_attempt(&tier.name, status.as_str(), latency);
            tracing::warn!(
                tier = %tier.name,
                path = %request.path(),
                status = status.as_str(),
                latency_ms = latency.as_millis() as u64,
                error = %error,
                "Tier attempt failed, falling back"
            );
            outcomes.push(FallbackOutcome::new(&tier.name, status, latency, Some(error)));
        }

        Err(AllTiersFailed { outcomes }.into())
    }
}
