#![warn(missing_docs)]
//!
//! Domain-restricted [OpenID Connect](https://openid.net/specs/openid-connect-core-1_0.html)
//! login step for single sign-on hosts.
//!
//! After the host's OAuth flow has exchanged the authorization code for a token response, the
//! [`FetchUser`] step reads the ID token out of the response, decodes its claims, and checks the
//! end-user's email domain against a configured [`DomainPolicy`].
//!
//! # Security Warning
//!
//! The ID token's signature is **not** verified. The claims are trusted because the token was
//! received directly from the token endpoint over TLS. Do not feed tokens from any other channel
//! (e.g., a browser redirect) into this crate.
//!
//! # Example
//!
//! ```
//! use oidc_domain_gate::{
//!     AuthRequest, AuthStep, Domain, DomainPolicy, FlowState, MemoryFlowState, OidcProvider,
//!     OidcSettings, ProviderConfig, StepOutcome,
//! };
//! use serde_json::json;
//! use std::collections::HashSet;
//! use std::sync::Arc;
//!
//! let settings = Arc::new(OidcSettings::new().set_domain_policy(DomainPolicy::new(
//!     HashSet::from([Domain::from("example.com")]),
//!     HashSet::new(),
//! )));
//! let provider = OidcProvider::new(settings, ProviderConfig::new());
//!
//! // `{"alg":"none"}` . `{"email":"jane@example.com"}` . `sig`
//! let mut state = MemoryFlowState::new().with_state(
//!     "data",
//!     json!({"id_token": "eyJhbGciOiJub25lIn0.eyJlbWFpbCI6ImphbmVAZXhhbXBsZS5jb20ifQ.c2ln"}),
//! );
//!
//! let outcome = provider
//!     .fetch_user_step()
//!     .dispatch(&AuthRequest::new("flow-1"), &mut state);
//! assert_eq!(outcome, StepOutcome::Continue);
//! assert_eq!(state.fetch_state("domain"), Some(&json!("example.com")));
//! ```

// Defined first since other modules need the macros, and definition order is significant for
// macros.
#[macro_use]
mod macros;

mod helpers;

/// Configuration page of an OIDC auth provider.
pub mod configure;
/// End-user domain resolution and allow/block policy.
pub mod domain;
/// Host flow integration and the `FetchUser` step.
pub mod flow;
/// Unverified ID token decoding.
pub mod id_token;
/// Provider configuration and identity construction.
pub mod provider;
/// Process-wide settings.
pub mod settings;

pub use crate::configure::{ConfigurePage, ConfigureView, RenderedView, CONFIGURE_TEMPLATE};
pub use crate::domain::{extract_domain, Domain, DomainPolicy, DomainPolicyError, DomainSource};
pub use crate::flow::{
    invalid_domain_message, AuthRequest, AuthStep, FetchUser, FetchUserError, FlowState,
    MemoryFlowState, StepOutcome, DATA_STATE_KEY, DOMAIN_STATE_KEY, ERR_INVALID_DOMAIN,
    ERR_INVALID_RESPONSE, USER_STATE_KEY,
};
pub use crate::id_token::{extract_claims, IdTokenClaims, IdTokenError, TokenSegment};
pub use crate::provider::{
    Identity, OAuthData, OidcProvider, ProviderConfig, ProviderError, DATA_VERSION,
};
pub use crate::settings::{IssuerName, OidcSettings, SettingsError};
