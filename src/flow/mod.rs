use crate::domain::{Domain, DomainPolicyError, DomainSource};
use crate::id_token::{extract_claims, IdTokenClaims, IdTokenError};
use crate::settings::OidcSettings;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;


/// Flow state key holding the OAuth token response.
pub const DATA_STATE_KEY: &str = "data";
/// Flow state key bound to the end-user's domain on success.
pub const DOMAIN_STATE_KEY: &str = "domain";
/// Flow state key bound to the ID token claims on success.
pub const USER_STATE_KEY: &str = "user";

const ID_TOKEN_FIELD: &str = "id_token";

/// User-facing message for a token response that could not be used.
pub const ERR_INVALID_RESPONSE: &str = "invalid response";
/// User-facing message template for a rejected domain; `%s` is replaced with the domain.
pub const ERR_INVALID_DOMAIN: &str = "invalid domain: %s";

/// Renders [`ERR_INVALID_DOMAIN`] for `domain`, using the empty string when no domain was
/// resolved.
pub fn invalid_domain_message(domain: Option<&Domain>) -> String {
    ERR_INVALID_DOMAIN.replacen("%s", domain.map(|d| d.as_str()).unwrap_or_default(), 1)
}

/// State of one in-progress authentication attempt, owned by the host.
pub trait FlowState {
    /// Returns the value bound to `key`, if any.
    fn fetch_state(&self, key: &str) -> Option<&Value>;

    /// Binds `value` to `key`, replacing any previous value.
    fn bind_state(&mut self, key: &str, value: Value);
}

/// In-memory [`FlowState`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MemoryFlowState(HashMap<String, Value>);
impl MemoryFlowState {
    /// Creates an empty flow state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `key` and returns the state.
    pub fn with_state(mut self, key: &str, value: Value) -> Self {
        self.bind_state(key, value);
        self
    }

    /// Number of bound keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no keys are bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl FlowState for MemoryFlowState {
    fn fetch_state(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn bind_state(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }
}

/// Request context the host passes to each step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthRequest {
    flow_id: String,
}
impl AuthRequest {
    /// Creates a request context for the attempt identified by `flow_id`. The id only labels
    /// log records.
    pub fn new(flow_id: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
        }
    }

    /// Identifier of the authentication attempt.
    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }
}

/// Result of dispatching a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Advance to the next step of the host flow.
    Continue,
    /// End the attempt and show the given message to the user. No further steps run.
    Terminate(String),
}

/// A single step of a host authentication flow.
pub trait AuthStep: Debug + Send + Sync {
    /// Runs the step against the attempt's flow state.
    fn dispatch(&self, request: &AuthRequest, state: &mut dyn FlowState) -> StepOutcome;
}

/// Error fetching the end-user from the token response.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchUserError {
    /// The token response has no `id_token`.
    #[error("Missing id_token in OAuth response")]
    MissingToken,
    /// The ID token could not be decoded.
    #[error("Unable to decode id_token")]
    InvalidIdToken(#[from] IdTokenError),
    /// The end-user's domain was rejected.
    #[error(transparent)]
    InvalidDomain(#[from] DomainPolicyError),
}
impl FetchUserError {
    /// Message shown to the end-user. All response errors collapse into
    /// [`ERR_INVALID_RESPONSE`].
    pub fn user_message(&self) -> String {
        match self {
            FetchUserError::MissingToken | FetchUserError::InvalidIdToken(_) => {
                ERR_INVALID_RESPONSE.to_string()
            }
            FetchUserError::InvalidDomain(err) => invalid_domain_message(err.domain()),
        }
    }
}

/// Flow step that reads the ID token from the OAuth token response, decodes its claims and
/// checks the end-user's domain against the configured policy.
///
/// On success `domain` and `user` are bound in the flow state; on failure the state is left
/// untouched.
#[derive(Clone, Debug)]
pub struct FetchUser {
    settings: Arc<OidcSettings>,
    version: Option<String>,
}
impl FetchUser {
    /// Creates the step. `version` is the provider's stored configuration version; providers
    /// without one resolve the domain from the email address.
    pub fn new(settings: Arc<OidcSettings>, version: Option<String>) -> Self {
        Self { settings, version }
    }

    /// Where this step reads the end-user's domain from.
    pub fn domain_source(&self) -> DomainSource {
        DomainSource::from_version(self.version.as_deref())
    }

    /// Decodes the ID token held in the flow state and resolves the end-user's domain,
    /// without modifying the state.
    pub fn fetch_user(
        &self,
        state: &dyn FlowState,
    ) -> Result<(Domain, IdTokenClaims), FetchUserError> {
        let id_token = state
            .fetch_state(DATA_STATE_KEY)
            .and_then(|data| data.get(ID_TOKEN_FIELD))
            .and_then(Value::as_str)
            .ok_or(FetchUserError::MissingToken)?;

        let claims = extract_claims(id_token)?;
        let domain = self
            .settings
            .domain_policy()
            .evaluate(&claims, self.domain_source())?;

        Ok((domain, claims))
    }
}
impl AuthStep for FetchUser {
    fn dispatch(&self, request: &AuthRequest, state: &mut dyn FlowState) -> StepOutcome {
        match self.fetch_user(state) {
            Ok((domain, claims)) => {
                log::info!("[{}] User domain: {}", request.flow_id(), domain);
                state.bind_state(DOMAIN_STATE_KEY, Value::String(domain.into_inner()));
                state.bind_state(USER_STATE_KEY, claims.into_value());
                StepOutcome::Continue
            }
            Err(err) => {
                match &err {
                    FetchUserError::MissingToken => log::error!(
                        "[{}] {}: {:?}",
                        request.flow_id(),
                        err,
                        state.fetch_state(DATA_STATE_KEY)
                    ),
                    FetchUserError::InvalidIdToken(IdTokenError::MissingEmail) => log::error!(
                        "[{}] {}: {:?}",
                        request.flow_id(),
                        err,
                        state
                            .fetch_state(DATA_STATE_KEY)
                            .and_then(|data| data.get(ID_TOKEN_FIELD))
                    ),
                    FetchUserError::InvalidIdToken(cause) => {
                        log::error!("[{}] {}: {}", request.flow_id(), err, cause)
                    }
                    FetchUserError::InvalidDomain(_) => {
                        log::warn!("[{}] {}", request.flow_id(), err)
                    }
                }
                StepOutcome::Terminate(err.user_message())
            }
        }
    }
}
