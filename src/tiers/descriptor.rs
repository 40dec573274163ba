//! Tier descriptors: the immutable, validated view of `[[tiers]]`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::auth::{AuthError, Signer, SigningSecret};
use crate::config::schema::{TierAuthKind, TierConfig};

/// Read-only tier table shared by every resolver invocation.
pub type TierTable = Arc<[TierDescriptor]>;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("tier '{tier}': invalid base URL: {source}")]
    InvalidUrl {
        tier: String,
        #[source]
        source: url::ParseError,
    },

    #[error("tier '{tier}': {source}")]
    Secret {
        tier: String,
        #[source]
        source: AuthError,
    },
}

/// Credentials a tier call carries.
#[derive(Clone)]
pub enum Credentials {
    None,
    ApiKey(String),
    Signing(Signer),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::None => f.write_str("None"),
            Credentials::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Credentials::Signing(_) => f.write_str("Signing(<redacted>)"),
        }
    }
}

/// One backend tier.
#[derive(Debug, Clone)]
pub struct TierDescriptor {
    pub name: String,
    pub base_url: Option<Url>,
    pub timeout: Duration,
    pub auth: TierAuthKind,
    pub credentials: Credentials,
    pub requires_credentials: bool,
}

impl TierDescriptor {
    /// Build a descriptor. `shared` signs for `signed` tiers without their own secret.
    pub fn from_config(config: &TierConfig, shared: &Signer) -> Result<Self, DescriptorError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|source| DescriptorError::InvalidUrl {
                tier: config.name.clone(),
                source,
            })?;

        let credentials = match config.auth {
            TierAuthKind::None => Credentials::None,
            TierAuthKind::Bearer | TierAuthKind::ApiKey => match &config.api_key {
                Some(key) => Credentials::ApiKey(key.clone()),
                None => Credentials::None,
            },
            TierAuthKind::Signed => match &config.secret {
                Some(secret) => {
                    let secret = SigningSecret::new(secret).map_err(|source| DescriptorError::Secret {
                        tier: config.name.clone(),
                        source,
                    })?;
                    Credentials::Signing(shared.with_secret(secret))
                }
                None => Credentials::Signing(shared.clone()),
            },
        };

        Ok(Self {
            name: config.name.clone(),
            base_url,
            timeout: Duration::from_millis(config.timeout_ms),
            auth: config.auth,
            credentials,
            requires_credentials: config
                .requires_credentials
                .unwrap_or(config.auth != TierAuthKind::None),
        })
    }

    /// A tier is usable when it has a URL and, if it needs them, credentials.
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
            && (!self.requires_credentials || !matches!(self.credentials, Credentials::None))
    }

    /// Resolve `segments` against the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[String]) -> Option<Url> {
        let mut url = self.base_url.clone()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(segments.iter().map(String::as_str));
        Some(url)
    }
}

/// Build the shared tier table in configured order.
pub fn build_tier_table(tiers: &[TierConfig], shared: &Signer) -> Result<TierTable, DescriptorError> {
    tiers
        .iter()
        .map(|tier| TierDescriptor::from_config(tier, shared))
        .collect::<Result<Vec<_>, _>>()
        .map(Arc::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SignatureScheme;

    fn shared() -> Signer {
        Signer::new(
            SigningSecret::new("shared").unwrap(),
            SignatureScheme::BodyAndTimestamp,
            Duration::from_secs(300),
        )
    }

    #[test]
    fn test_configured_requires_url_and_credentials() {
        let mut config = TierConfig::new("store", TierAuthKind::ApiKey);
        assert!(!TierDescriptor::from_config(&config, &shared()).unwrap().is_configured());

        config.base_url = Some("https://db.example.com/rest/v1".into());
        assert!(!TierDescriptor::from_config(&config, &shared()).unwrap().is_configured());

        config.api_key = Some("anon".into());
        assert!(TierDescriptor::from_config(&config, &shared()).unwrap().is_configured());

        let mut open = TierConfig::new("public", TierAuthKind::None);
        open.base_url = Some("http://127.0.0.1:9000".into());
        assert!(TierDescriptor::from_config(&open, &shared()).unwrap().is_configured());
    }

    #[test]
    fn test_signed_tier_falls_back_to_shared_secret() {
        let mut config = TierConfig::new("workflow", TierAuthKind::Signed);
        config.base_url = Some("http://hooks.local".into());
        let tier = TierDescriptor::from_config(&config, &shared()).unwrap();
        assert!(tier.is_configured());
        assert!(matches!(tier.credentials, Credentials::Signing(_)));
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes() {
        let mut config = TierConfig::new("store", TierAuthKind::None);
        config.base_url = Some("https://db.example.com/rest/v1/".into());
        let tier = TierDescriptor::from_config(&config, &shared()).unwrap();

        let url = tier
            .endpoint(&["settings".to_string(), "a b/c".to_string()])
            .unwrap();
        assert_eq!(url.as_str(), "https://db.example.com/rest/v1/settings/a%20b%2Fc");
    }

    #[test]
    fn test_table_preserves_order() {
        let table = build_tier_table(&crate::config::schema::default_tiers(), &shared()).unwrap();
        let names: Vec<_> = table.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["control", "workflow", "store"]);
        assert!(table.iter().all(|t| !t.is_configured()));
    }
}
