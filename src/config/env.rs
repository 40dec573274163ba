//! Environment-variable overrides.
//!
//! Every recognised `TIERLINE_*` variable overrides the matching TOML value.
//! Per-tier variables are keyed by the upper-cased tier name, e.g.
//! `TIERLINE_STORE_URL` or `TIERLINE_CONTROL_TIMEOUT_MS`.

use std::collections::HashMap;
use std::str::FromStr;

use crate::config::loader::ConfigError;
use crate::config::schema::PipelineConfig;

pub const ENV_PREFIX: &str = "TIERLINE_";

/// Load `.env.local` and then `.env` into the process environment, if present.
///
/// Variables already set in the environment win. A missing file is not an
/// error; a malformed one is reported and skipped.
pub fn load_dotenv() {
    for file in [".env.local", ".env"] {
        match dotenvy::from_filename(file) {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded env file"),
            Err(dotenvy::Error::Io(_)) => {}
            Err(e) => eprintln!("Warning: failed to load {}: {}", file, e),
        }
    }
}

/// Apply `TIERLINE_*` overrides from `vars` onto `config`.
pub fn apply_env_overrides<I>(config: &mut PipelineConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: HashMap<String, String> = vars
        .into_iter()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect();
    let get = |name: &str| lookup(&vars, name);

    if let Some(v) = get("BIND") {
        config.listener.bind_address = v.to_string();
    }
    if let Some(v) = get("SIGNING_SECRET") {
        config.signing.secret = Some(v.to_string());
    }
    if let Some(v) = get("CALLER_KEY") {
        config.signing.caller_key = v.to_string();
    }
    if let Some(v) = get("SIGNATURE_TOLERANCE_SECS") {
        config.signing.tolerance_secs = parse("SIGNATURE_TOLERANCE_SECS", v)?;
    }
    if let Some(v) = get("ADMIN_KEY") {
        config.admin.api_key = Some(v.to_string());
    }
    if let Some(v) = get("METRICS_ADDRESS") {
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = v.to_string();
    }

    if let Some(v) = get("RETRY_MAX_ATTEMPTS") {
        config.retries.max_attempts = parse("RETRY_MAX_ATTEMPTS", v)?;
    }
    if let Some(v) = get("RETRY_WARN_AFTER") {
        config.retries.warn_after = parse("RETRY_WARN_AFTER", v)?;
    }
    if let Some(v) = get("RETRY_INITIAL_DELAY_MS") {
        config.retries.initial_delay_ms = parse("RETRY_INITIAL_DELAY_MS", v)?;
    }
    if let Some(v) = get("RETRY_MAX_DELAY_MS") {
        config.retries.max_delay_ms = parse("RETRY_MAX_DELAY_MS", v)?;
    }
    if let Some(v) = get("RETRY_MULTIPLIER") {
        config.retries.multiplier = parse("RETRY_MULTIPLIER", v)?;
    }

    for tier in &mut config.tiers {
        let key = tier.name.to_uppercase().replace('-', "_");
        if let Some(v) = get(&format!("{key}_URL")) {
            tier.base_url = Some(v.to_string()).filter(|s| !s.is_empty());
        }
        if let Some(v) = get(&format!("{key}_API_KEY")) {
            tier.api_key = Some(v.to_string()).filter(|s| !s.is_empty());
        }
        if let Some(v) = get(&format!("{key}_SECRET")) {
            tier.secret = Some(v.to_string()).filter(|s| !s.is_empty());
        }
        let timeout_var = format!("{key}_TIMEOUT_MS");
        if let Some(v) = get(&timeout_var) {
            tier.timeout_ms = parse(&timeout_var, v)?;
        }
    }

    Ok(())
}

fn lookup<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(&format!("{ENV_PREFIX}{name}")).map(String::as_str)
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var: format!("{ENV_PREFIX}{name}"),
        message: e.to_string(),
    })
}
