//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Refuse to run without a signing secret (fail closed)
//! - Validate value ranges (timeouts > 0, multiplier >= 1, capacity > 0)
//! - Keep the request timeout longer than the whole tier cascade
//! - Detect duplicate tier names and malformed tier URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PipelineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{PipelineConfig, RetryConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("signing secret is not configured")]
    MissingSigningSecret,

    #[error("caller key must not be empty")]
    EmptyCallerKey,

    #[error("signature tolerance must be greater than zero")]
    ZeroTolerance,

    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("request timeout ({request_ms}ms) must exceed the combined tier timeouts ({cascade_ms}ms)")]
    RequestTimeoutTooShort { request_ms: u64, cascade_ms: u64 },

    #[error("at least one tier must be defined")]
    NoTiers,

    #[error("duplicate tier name '{0}'")]
    DuplicateTier(String),

    #[error("tier '{tier}' has invalid base URL '{url}': {reason}")]
    InvalidTierUrl {
        tier: String,
        url: String,
        reason: String,
    },

    #[error("tier '{0}' has a zero timeout")]
    ZeroTierTimeout(String),

    #[error("invalid retry settings: {0}")]
    InvalidRetry(String),

    #[error("queue capacity must be greater than zero")]
    ZeroQueueCapacity,
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config
        .signing
        .secret
        .as_deref()
        .map_or(true, |s| s.trim().is_empty())
    {
        errors.push(ValidationError::MissingSigningSecret);
    }
    if config.signing.caller_key.trim().is_empty() {
        errors.push(ValidationError::EmptyCallerKey);
    }
    if config.signing.tolerance_secs == 0 {
        errors.push(ValidationError::ZeroTolerance);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if config.tiers.is_empty() {
        errors.push(ValidationError::NoTiers);
    }

    // A progress report is only queued once every tier has failed, so the
    // request deadline has to outlast the whole cascade.
    let cascade_ms = config
        .tiers
        .iter()
        .map(|t| t.timeout_ms)
        .fold(0u64, u64::saturating_add);
    let request_ms = config.listener.request_timeout_secs.saturating_mul(1_000);
    if request_ms > 0 && request_ms <= cascade_ms {
        errors.push(ValidationError::RequestTimeoutTooShort { request_ms, cascade_ms });
    }

    let mut seen = HashSet::new();
    for tier in &config.tiers {
        if !seen.insert(tier.name.to_lowercase()) {
            errors.push(ValidationError::DuplicateTier(tier.name.clone()));
        }
        if tier.timeout_ms == 0 {
            errors.push(ValidationError::ZeroTierTimeout(tier.name.clone()));
        }
        if let Some(raw) = &tier.base_url {
            if let Err(reason) = check_base_url(raw) {
                errors.push(ValidationError::InvalidTierUrl {
                    tier: tier.name.clone(),
                    url: raw.clone(),
                    reason,
                });
            }
        }
    }

    check_retry(&config.retries, &mut errors);

    if config.queue.capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check retry tuning on its own, for callers that only build a retry policy.
pub fn validate_retry(retries: &RetryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_retry(retries, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_retry(retries: &RetryConfig, errors: &mut Vec<ValidationError>) {
    if retries.max_attempts == 0 {
        errors.push(ValidationError::InvalidRetry("max_attempts must be at least 1".into()));
    }
    if retries.warn_after == 0 {
        errors.push(ValidationError::InvalidRetry("warn_after must be at least 1".into()));
    }
    if !retries.multiplier.is_finite() || retries.multiplier < 1.0 {
        errors.push(ValidationError::InvalidRetry(format!(
            "multiplier must be a finite number >= 1, got {}",
            retries.multiplier
        )));
    }
    if retries.initial_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::InvalidRetry(format!(
            "initial_delay_ms ({}) exceeds max_delay_ms ({})",
            retries.initial_delay_ms, retries.max_delay_ms
        )));
    }
}

fn check_base_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}
