use crate::id_token::IdTokenClaims;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::collections::HashSet;


new_type![
    /// Email domain of an end-user, e.g. `example.com`.
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub Domain(String)
];
impl From<&str> for Domain {
    fn from(s: &str) -> Self {
        Domain::new(s.to_string())
    }
}

/// Where the end-user's domain is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomainSource {
    /// Suffix of the `email` claim after the last `@`. Used by providers configured before
    /// hosted-domain support existed.
    LegacyEmail,
    /// The `hd` (hosted domain) claim.
    HostedDomain,
}
impl DomainSource {
    /// Providers without a stored configuration version use the legacy email source.
    pub fn from_version(version: Option<&str>) -> Self {
        match version {
            None => DomainSource::LegacyEmail,
            Some(_) => DomainSource::HostedDomain,
        }
    }

    /// Reads the domain from the claims, without applying any policy.
    pub fn resolve(&self, claims: &IdTokenClaims) -> Option<Domain> {
        match self {
            DomainSource::LegacyEmail => Some(extract_domain(claims.email())),
            DomainSource::HostedDomain => claims.hosted_domain().map(Domain::from),
        }
    }
}

/// Error evaluating a domain against a [`DomainPolicy`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DomainPolicyError {
    /// The domain is absent, empty, blocked or not allowed.
    #[error("Invalid domain: {}", .0.as_deref().map(String::as_str).unwrap_or_default())]
    InvalidDomain(Option<Domain>),
}
impl DomainPolicyError {
    /// The offending domain, if one was resolved.
    pub fn domain(&self) -> Option<&Domain> {
        match self {
            DomainPolicyError::InvalidDomain(domain) => domain.as_ref(),
        }
    }
}

/// Allow and block lists of end-user domains.
///
/// An empty allowlist admits every domain that is not blocked. The blocklist always wins.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct DomainPolicy {
    #[serde(default)]
    allowlist: HashSet<Domain>,
    #[serde(default)]
    blocklist: HashSet<Domain>,
}
impl DomainPolicy {
    /// Creates a policy from the given lists.
    pub fn new(allowlist: HashSet<Domain>, blocklist: HashSet<Domain>) -> Self {
        Self {
            allowlist,
            blocklist,
        }
    }

    /// Domains allowed to authenticate. Empty means no restriction.
    pub fn allowlist(&self) -> &HashSet<Domain> {
        &self.allowlist
    }

    /// Domains never allowed to authenticate.
    pub fn blocklist(&self) -> &HashSet<Domain> {
        &self.blocklist
    }

    /// Replaces the allowlist.
    pub fn set_allowlist(mut self, allowlist: HashSet<Domain>) -> Self {
        self.allowlist = allowlist;
        self
    }

    /// Replaces the blocklist.
    pub fn set_blocklist(mut self, blocklist: HashSet<Domain>) -> Self {
        self.blocklist = blocklist;
        self
    }

    /// Resolves the end-user's domain from `claims` and checks it against this policy.
    pub fn evaluate(
        &self,
        claims: &IdTokenClaims,
        source: DomainSource,
    ) -> Result<Domain, DomainPolicyError> {
        self.check(source.resolve(claims))
    }

    /// Checks an already-resolved domain against this policy.
    ///
    /// Rejections happen in order: absent or empty, blocked, then not allowed.
    pub fn check(&self, domain: Option<Domain>) -> Result<Domain, DomainPolicyError> {
        let domain = match domain {
            Some(domain) if !domain.is_empty() => domain,
            other => return Err(DomainPolicyError::InvalidDomain(other)),
        };

        if self.blocklist.contains(&domain) {
            return Err(DomainPolicyError::InvalidDomain(Some(domain)));
        }

        if !self.allowlist.is_empty() && !self.allowlist.contains(&domain) {
            return Err(DomainPolicyError::InvalidDomain(Some(domain)));
        }

        Ok(domain)
    }
}

/// Returns everything after the last `@` in `email`.
///
/// An address without `@` yields the whole string.
pub fn extract_domain(email: &str) -> Domain {
    let domain = email.rsplit_once('@').map_or(email, |(_, domain)| domain);
    Domain::from(domain)
}
