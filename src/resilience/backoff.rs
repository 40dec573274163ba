//! Exponential backoff schedule.

use std::time::Duration;

use crate::config::schema::RetryConfig;

/// Deterministic exponential backoff: `min(initial * multiplier^attempt, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay after the first failed attempt.
    pub initial: Duration,
    /// Growth factor between consecutive delays (>= 1.0).
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            multiplier: 2.0,
            max: Duration::from_secs(16),
        }
    }
}

impl Backoff {
    pub fn new(initial: Duration, multiplier: f64, max: Duration) -> Self {
        Self { initial, multiplier, max }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.initial_delay_ms),
            multiplier: config.multiplier,
            max: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay to wait after the attempt with zero-based index `attempt` failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exponent);

        // Saturate on overflow, NaN and anything past the cap.
        match Duration::try_from_secs_f64(secs) {
            Ok(delay) => delay.min(self.max),
            Err(_) => self.max,
        }
    }
}
