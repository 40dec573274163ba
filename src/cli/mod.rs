//! Output and exit-code handling for `tierline-cli`.
//!
//! # Data Flow
//! ```text
//! PipelineClient result
//!     → CliOutcome (data / no data / failure)
//!     → render.rs (JSON payload or tier trail → Table)
//!     → table.rs (aligned text)
//!     → stdout / stderr + exit code
//! ```
//!
//! # Design Decisions
//! - "Not found" is a successful run: it prints a notice and exits 0
//! - Failures print one line on stderr; the tier trail only with `--verbose`
//! - Retry tuning from the environment and flags is validated like the server's
//! - Startup errors use their Display form, never Debug

pub mod render;
pub mod table;

use std::error::Error;

use serde_json::Value;

use crate::client::ClientError;
use crate::config::{validate_retry, ConfigError, RetryConfig};
use crate::resilience::{Fetched, RetryPolicy};
use crate::tiers::FallbackOutcome;

pub use render::{outcome_table, value_table};
pub use table::Table;

/// Printed when the pipeline reports "not found".
pub const NO_DATA: &str = "no data available";

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Build the client's retry policy, with an optional `--max-attempts` override.
pub fn retry_policy(retries: &RetryConfig, max_attempts: Option<u32>) -> Result<RetryPolicy, ConfigError> {
    let mut retries = retries.clone();
    if let Some(max_attempts) = max_attempts {
        retries.max_attempts = max_attempts;
    }
    validate_retry(&retries).map_err(ConfigError::Validation)?;
    Ok(RetryPolicy::from_config(&retries))
}

/// One stderr line for an error that stopped a binary before it could run.
pub fn startup_error(error: &dyn Error) -> String {
    format!("error: {error}\n")
}

/// Terminal state of one CLI command.
#[derive(Debug)]
pub enum CliOutcome {
    Data(Value),
    NoData,
    Failed {
        reason: String,
        outcomes: Vec<FallbackOutcome>,
    },
}

impl CliOutcome {
    pub fn from_fetched(result: Result<Fetched<Value>, ClientError>) -> Self {
        match result {
            Ok(Fetched::Found(value)) => CliOutcome::Data(value),
            Ok(Fetched::NotFound) => CliOutcome::NoData,
            Err(e) => Self::from_error(&e),
        }
    }

    pub fn from_value(result: Result<Value, ClientError>) -> Self {
        match result {
            Ok(value) => CliOutcome::Data(value),
            Err(e) => Self::from_error(&e),
        }
    }

    fn from_error(error: &ClientError) -> Self {
        CliOutcome::Failed {
            reason: error.to_string(),
            outcomes: error.outcomes().to_vec(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            CliOutcome::Data(_) | CliOutcome::NoData => EXIT_OK,
            CliOutcome::Failed { .. } => EXIT_FAILURE,
        }
    }

    /// Text for stdout, if any.
    pub fn stdout(&self) -> Option<String> {
        match self {
            CliOutcome::Data(value) => Some(value_table(value).to_string()),
            CliOutcome::NoData => Some(format!("{NO_DATA}\n")),
            CliOutcome::Failed { .. } => None,
        }
    }

    /// Text for stderr, if any.
    pub fn stderr(&self, verbose: bool) -> Option<String> {
        let CliOutcome::Failed { reason, outcomes } = self else {
            return None;
        };

        let mut text = format!("error: {reason}\n");
        if verbose && !outcomes.is_empty() {
            text.push('\n');
            text.push_str(&outcome_table(outcomes).to_string());
        }
        Some(text)
    }
}
