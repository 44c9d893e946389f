use crate::configure::ConfigureView;
use crate::domain::Domain;
use crate::flow::{FetchUser, FlowState, DATA_STATE_KEY, DOMAIN_STATE_KEY, USER_STATE_KEY};
use crate::helpers::{bool_claim, deserialize_string_or_vec_opt, str_claim};
use crate::id_token::{IdTokenClaims, IdTokenError};
use crate::settings::OidcSettings;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use thiserror::Error;

use std::sync::Arc;


/// Configuration version written by [`OidcProvider::build_config`]. Providers saved with a
/// version resolve the end-user's domain from the `hd` claim.
pub const DATA_VERSION: &str = "1";

const MAX_EXPIRES_IN_SECS: i64 = u32::MAX as i64;

/// Stored configuration of one OIDC auth provider.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct ProviderConfig {
    // Single domain written by legacy providers.
    #[serde(default)]
    domain: Option<Domain>,
    #[serde(default, deserialize_with = "deserialize_string_or_vec_opt")]
    domains: Option<Vec<Domain>>,
    #[serde(default)]
    version: Option<String>,
}
impl ProviderConfig {
    /// Creates an empty (legacy) provider configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a stored provider configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
        let deserializer = &mut serde_json::Deserializer::from_str(json);
        serde_path_to_error::deserialize(deserializer)
    }

    /// Legacy single domain.
    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    /// Sets the legacy single domain.
    pub fn set_domain(mut self, domain: Option<Domain>) -> Self {
        self.domain = domain;
        self
    }

    /// Configured domains.
    pub fn domains(&self) -> Option<&Vec<Domain>> {
        self.domains.as_ref()
    }

    /// Sets the configured domains.
    pub fn set_domains(mut self, domains: Option<Vec<Domain>>) -> Self {
        self.domains = domains;
        self
    }

    /// Configuration version; `None` for legacy providers.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Sets the configuration version.
    pub fn set_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    /// The configured domains as a list. A non-empty legacy `domain` takes precedence over
    /// `domains`; an unconfigured provider has none.
    pub fn configured_domains(&self) -> Vec<Domain> {
        match &self.domain {
            Some(domain) if !domain.is_empty() => vec![domain.clone()],
            _ => self.domains.clone().unwrap_or_default(),
        }
    }
}

/// Error building provider output from a completed flow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// A flow state key is missing or has the wrong type.
    #[error("Missing `{0}` in flow state")]
    MissingState(&'static str),
    /// The bound user claims are not usable.
    #[error("Invalid user claims")]
    InvalidClaims(#[source] IdTokenError),
    /// The user claims have no `sub`.
    #[error("Missing sub in user claims")]
    MissingSubject,
}

/// OAuth token data stored with an [`Identity`].
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct OAuthData {
    access_token: Option<String>,
    token_type: Option<String>,
    refresh_token: Option<String>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    expires: Option<DateTime<Utc>>,
}
impl OAuthData {
    fn from_token_response(data: &serde_json::Map<String, Value>, now: DateTime<Utc>) -> Self {
        let expires_in = data.get("expires_in").and_then(|value| match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        Self {
            access_token: str_claim(data, "access_token").map(str::to_string),
            token_type: str_claim(data, "token_type").map(str::to_string),
            refresh_token: str_claim(data, "refresh_token").map(str::to_string),
            expires: expires_in
                .filter(|secs| (0..=MAX_EXPIRES_IN_SECS).contains(secs))
                .map(|secs| now + Duration::seconds(secs)),
        }
    }

    /// OAuth access token.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// OAuth token type, usually `Bearer`.
    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    /// OAuth refresh token.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// When the access token expires.
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }
}

/// End-user identity produced by a completed flow.
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Identity {
    id: String,
    email: String,
    email_verified: Option<bool>,
    name: Option<String>,
    data: OAuthData,
}
impl Identity {
    /// Stable subject identifier (`sub` claim).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// End-user email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Whether the provider verified the email address.
    pub fn email_verified(&self) -> Option<bool> {
        self.email_verified
    }

    /// End-user display name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// OAuth token data.
    pub fn data(&self) -> &OAuthData {
        &self.data
    }
}

/// An OIDC auth provider: process-wide settings plus one provider's stored configuration.
#[derive(Clone, Debug)]
pub struct OidcProvider {
    settings: Arc<OidcSettings>,
    config: ProviderConfig,
}
impl OidcProvider {
    /// Creates a provider.
    pub fn new(settings: Arc<OidcSettings>, config: ProviderConfig) -> Self {
        Self { settings, config }
    }

    /// Process-wide settings.
    pub fn settings(&self) -> &OidcSettings {
        &self.settings
    }

    /// Stored provider configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// The step that fetches and checks the end-user after the OAuth callback.
    pub fn fetch_user_step(&self) -> FetchUser {
        FetchUser::new(
            self.settings.clone(),
            self.config.version().map(str::to_string),
        )
    }

    /// The read-only configuration page for this provider.
    pub fn configure_view(&self) -> ConfigureView {
        ConfigureView::new(self.settings.clone())
    }

    /// Configuration to store once a flow completes: the end-user's domain and the current
    /// [`DATA_VERSION`].
    pub fn build_config(&self, state: &dyn FlowState) -> Result<ProviderConfig, ProviderError> {
        let domain = state
            .fetch_state(DOMAIN_STATE_KEY)
            .and_then(Value::as_str)
            .ok_or(ProviderError::MissingState(DOMAIN_STATE_KEY))?;

        Ok(ProviderConfig::new()
            .set_domains(Some(vec![Domain::from(domain)]))
            .set_version(Some(DATA_VERSION.to_string())))
    }

    /// Builds the end-user identity from a completed flow.
    pub fn build_identity(&self, state: &dyn FlowState) -> Result<Identity, ProviderError> {
        self.build_identity_at(state, Utc::now())
    }

    pub(crate) fn build_identity_at(
        &self,
        state: &dyn FlowState,
        now: DateTime<Utc>,
    ) -> Result<Identity, ProviderError> {
        let data = state
            .fetch_state(DATA_STATE_KEY)
            .and_then(Value::as_object)
            .ok_or(ProviderError::MissingState(DATA_STATE_KEY))?;
        let user = state
            .fetch_state(USER_STATE_KEY)
            .ok_or(ProviderError::MissingState(USER_STATE_KEY))?;
        let claims =
            IdTokenClaims::try_from(user.clone()).map_err(ProviderError::InvalidClaims)?;

        let id = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|sub| !sub.is_empty())
            .ok_or(ProviderError::MissingSubject)?;

        Ok(Identity {
            id: id.to_string(),
            email: claims.email().to_string(),
            email_verified: claims.get("email_verified").and_then(bool_claim),
            name: str_claim(claims.as_map(), "name").map(str::to_string),
            data: OAuthData::from_token_response(data, now),
        })
    }
}
