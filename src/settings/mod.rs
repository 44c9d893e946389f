use crate::domain::{Domain, DomainPolicy};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::collections::HashSet;
use std::env;


/// Environment variable holding the identity issuer's display name.
pub const ISSUER_ENV: &str = "OIDC_ISSUER";
/// Environment variable holding the comma- or whitespace-separated domain allowlist.
pub const DOMAIN_ALLOWLIST_ENV: &str = "OIDC_DOMAIN_ALLOWLIST";
/// Environment variable holding the comma- or whitespace-separated domain blocklist.
pub const DOMAIN_BLOCKLIST_ENV: &str = "OIDC_DOMAIN_BLOCKLIST";

new_type![
    /// Human-readable name of the identity issuer, shown on the configuration page.
    #[derive(Deserialize, Serialize)]
    pub IssuerName(String)
];

/// Error loading [`OidcSettings`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// Failed to parse the settings document.
    #[error("Failed to parse OIDC settings")]
    Parse(#[source] serde_path_to_error::Error<serde_json::Error>),
}

/// Process-wide OIDC settings, read once at startup and shared read-only between login
/// attempts.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct OidcSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issuer: Option<IssuerName>,
    #[serde(flatten)]
    domain_policy: DomainPolicy,
}
impl OidcSettings {
    /// Creates empty settings: no issuer name, no domain restrictions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses settings from a JSON document such as
    /// `{"issuer": "Example SSO", "allowlist": ["example.com"], "blocklist": []}`.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let deserializer = &mut serde_json::Deserializer::from_str(json);
        let settings: Self =
            serde_path_to_error::deserialize(deserializer).map_err(SettingsError::Parse)?;
        log::debug!(
            "Loaded OIDC settings: {} allowed and {} blocked domains",
            settings.domain_policy.allowlist().len(),
            settings.domain_policy.blocklist().len()
        );
        Ok(settings)
    }

    /// Reads settings from the `OIDC_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Reads settings from `(name, value)` pairs using the `OIDC_*` variable names. Unknown
    /// names are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::new();
        for (name, value) in vars {
            let value = value.as_ref();
            match name.as_ref() {
                ISSUER_ENV => {
                    let issuer = value.trim();
                    settings.issuer =
                        (!issuer.is_empty()).then(|| IssuerName::new(issuer.to_string()));
                }
                DOMAIN_ALLOWLIST_ENV => {
                    settings.domain_policy = settings
                        .domain_policy
                        .set_allowlist(parse_domain_list(value));
                }
                DOMAIN_BLOCKLIST_ENV => {
                    settings.domain_policy = settings
                        .domain_policy
                        .set_blocklist(parse_domain_list(value));
                }
                _ => {}
            }
        }
        log::debug!(
            "Loaded OIDC settings from environment: {} allowed and {} blocked domains",
            settings.domain_policy.allowlist().len(),
            settings.domain_policy.blocklist().len()
        );
        settings
    }

    /// Display name of the identity issuer.
    pub fn issuer(&self) -> Option<&IssuerName> {
        self.issuer.as_ref()
    }

    /// Sets the display name of the identity issuer.
    pub fn set_issuer(mut self, issuer: Option<IssuerName>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Domain allow and block lists.
    pub fn domain_policy(&self) -> &DomainPolicy {
        &self.domain_policy
    }

    /// Sets the domain allow and block lists.
    pub fn set_domain_policy(mut self, domain_policy: DomainPolicy) -> Self {
        self.domain_policy = domain_policy;
        self
    }
}

fn parse_domain_list(value: &str) -> HashSet<Domain> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|entry| !entry.is_empty())
        .map(Domain::from)
        .collect()
}
