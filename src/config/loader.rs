//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::env::apply_env_overrides;
use crate::config::schema::PipelineConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: String, message: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, message } => write!(f, "Invalid value for {}: {}", var, message),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<PipelineConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Load configuration from an optional TOML file plus the given environment,
/// then validate it.
pub fn load_config_with_env<I>(path: Option<&Path>, vars: I) -> Result<PipelineConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            parse_config(&content)?
        }
        None => PipelineConfig::default(),
    };

    apply_env_overrides(&mut config, vars)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration using the process environment.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    load_config_with_env(path, std::env::vars())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_beats_file() {
        let path = std::env::temp_dir().join(format!("tierline-config-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[signing]\nsecret = \"from-file\"\n\n[retries]\nmax_attempts = 2\n",
        )
        .unwrap();

        let config = load_config_with_env(
            Some(&path),
            vec![("TIERLINE_RETRY_MAX_ATTEMPTS".to_string(), "4".to_string())],
        )
        .unwrap();
        fs::remove_file(&path).unwrap_or_default();

        assert_eq!(config.signing.secret.as_deref(), Some("from-file"));
        assert_eq!(config.retries.max_attempts, 4);
    }

    #[test]
    fn test_missing_secret_rejected() {
        let err = load_config_with_env(None, Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors == &[ValidationError::MissingSigningSecret]));
        assert!(err.to_string().contains("signing secret"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config_with_env(Some(Path::new("/nonexistent/tierline.toml")), Vec::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
