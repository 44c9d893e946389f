use crate::helpers::{decode_base64_url_lenient, str_claim};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use std::fmt::{Display, Formatter, Result as FormatterResult};

#[cfg(test)]
mod tests;

const EMAIL_CLAIM: &str = "email";
const HOSTED_DOMAIN_CLAIM: &str = "hd";

/// One of the three dot-delimited segments of a compact JSON Web Token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenSegment {
    /// JOSE header.
    Header,
    /// Claims payload.
    Payload,
    /// Signature.
    Signature,
}
impl TokenSegment {
    const ALL: [TokenSegment; 3] = [
        TokenSegment::Header,
        TokenSegment::Payload,
        TokenSegment::Signature,
    ];
}
impl Display for TokenSegment {
    fn fmt(&self, f: &mut Formatter) -> FormatterResult {
        f.write_str(match self {
            TokenSegment::Header => "header",
            TokenSegment::Payload => "payload",
            TokenSegment::Signature => "signature",
        })
    }
}

/// Error decoding the claims of an ID token.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdTokenError {
    /// The token does not have three dot-delimited segments.
    #[error("Invalid JSON web token: found {0} parts (expected 3)")]
    MalformedToken(usize),
    /// A segment does not decode as base64url.
    #[error("Invalid base64url {segment} encoding")]
    DecodeError {
        /// Segment that failed to decode.
        segment: TokenSegment,
        /// Underlying decoding error.
        #[source]
        source: base64::DecodeError,
    },
    /// The payload is not a JSON object.
    #[error("Failed to parse payload JSON")]
    InvalidJson(#[source] serde_json::Error),
    /// The payload has no usable `email` claim.
    #[error("Missing email in id_token payload")]
    MissingEmail,
}

/// Claims decoded from the payload of an ID token.
///
/// The token signature is **not** verified; the claims are only as trustworthy as the channel
/// the token arrived on. Construction guarantees a non-empty `email` string claim.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdTokenClaims(Map<String, Value>);
impl IdTokenClaims {
    /// Wraps a claims map, checking for a non-empty `email` string claim.
    pub fn new(claims: Map<String, Value>) -> Result<Self, IdTokenError> {
        match str_claim(&claims, EMAIL_CLAIM) {
            Some(email) if !email.is_empty() => Ok(IdTokenClaims(claims)),
            _ => Err(IdTokenError::MissingEmail),
        }
    }

    /// End-user email address (`email` claim).
    pub fn email(&self) -> &str {
        // Checked non-empty in `new`.
        str_claim(&self.0, EMAIL_CLAIM).unwrap_or_default()
    }

    /// Hosted domain (`hd` claim), if present as a string.
    pub fn hosted_domain(&self) -> Option<&str> {
        str_claim(&self.0, HOSTED_DOMAIN_CLAIM)
    }

    /// Looks up an arbitrary claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Borrows the underlying claims map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the claims into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
impl TryFrom<Value> for IdTokenClaims {
    type Error = IdTokenError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let claims = serde_json::from_value::<Map<String, Value>>(value)
            .map_err(IdTokenError::InvalidJson)?;
        IdTokenClaims::new(claims)
    }
}

/// Decodes the claims of a compact ID token without verifying its signature.
///
/// The token is split into at most three segments, so anything following the second `.` stays
/// in the signature segment. Every segment is decoded even though only the payload is used;
/// symbols outside the base64url alphabet are skipped, so extra dots in the signature are
/// ignored.
pub fn extract_claims(id_token: &str) -> Result<IdTokenClaims, IdTokenError> {
    let parts = id_token.splitn(3, '.').collect::<Vec<_>>();

    // NB: We avoid including the token itself in the error output to avoid clients potentially
    // logging sensitive values.
    if parts.len() != 3 {
        return Err(IdTokenError::MalformedToken(parts.len()));
    }

    let mut decoded = parts
        .iter()
        .zip(TokenSegment::ALL)
        .map(|(part, segment)| {
            decode_base64_url_lenient(part)
                .map_err(|source| IdTokenError::DecodeError { segment, source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let raw_payload = decoded.swap_remove(1);

    let claims = serde_json::from_slice::<Map<String, Value>>(&raw_payload)
        .map_err(IdTokenError::InvalidJson)?;
    IdTokenClaims::new(claims)
}
