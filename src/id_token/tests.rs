use crate::id_token::{extract_claims, IdTokenClaims, IdTokenError, TokenSegment};

use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn encode_segment(raw: &[u8]) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(raw)
}

fn token_with_payload(payload: &Value) -> String {
    format!(
        "{}.{}.{}",
        encode_segment(br#"{"alg":"RS256"}"#),
        encode_segment(payload.to_string().as_bytes()),
        encode_segment(b"sig")
    )
}

#[test]
fn test_extract_claims() {
    let payload = json!({
        "iss": "https://accounts.example.com",
        "sub": "24400320",
        "email": "user@example.com",
        "hd": "example.com",
        "email_verified": true,
    });

    let claims = extract_claims(&token_with_payload(&payload)).expect("failed to extract claims");

    assert_eq!(claims.email(), "user@example.com");
    assert_eq!(claims.hosted_domain(), Some("example.com"));
    assert_eq!(claims.get("sub"), Some(&json!("24400320")));
    assert_eq!(claims.into_value(), payload);
}

#[test]
fn test_extract_claims_padded_segments() {
    // Two- and one-byte segments encode with trailing padding.
    let token = format!(
        "{}.{}.{}",
        base64::prelude::BASE64_URL_SAFE.encode("{}"),
        base64::prelude::BASE64_URL_SAFE.encode(r#"{"email":"a@b.co"}"#),
        base64::prelude::BASE64_URL_SAFE.encode("s"),
    );
    assert!(token.contains('='));

    let claims = extract_claims(&token).expect("failed to extract claims");
    assert_eq!(claims.email(), "a@b.co");
}

#[test]
fn test_extract_claims_too_few_parts() {
    for token in ["", "abc", "abc.def"] {
        match extract_claims(token) {
            Err(IdTokenError::MalformedToken(parts)) => {
                assert_eq!(parts, token.split('.').count())
            }
            other => panic!("unexpected result for {:?}: {:?}", token, other),
        }
    }
}

#[test]
fn test_extract_claims_keeps_extra_dots_in_signature() {
    let payload = encode_segment(br#"{"email":"user@example.com"}"#);

    // Extra segments land in the signature segment and are skipped while decoding it.
    let claims = extract_claims(&format!("e30.{}.c2ln.c2ln", payload))
        .expect("failed to extract claims");
    assert_eq!(claims.email(), "user@example.com");
    extract_claims(&format!("e30.{}.sig.with.dots", payload)).expect("failed to extract claims");

    // An empty signature is valid base64.
    let token = format!("e30.{}.", payload);
    extract_claims(&token).expect("failed to extract claims");
}

#[test]
fn test_extract_claims_invalid_segments() {
    let payload = encode_segment(br#"{"email":"user@example.com"}"#);

    for (token, expected_segment) in [
        (format!("c.{}.c2ln", payload), TokenSegment::Header),
        ("e30.e30.Z.c2ln".to_string(), TokenSegment::Signature),
        ("e30.e30=AA.c2ln".to_string(), TokenSegment::Payload),
        (format!("e30.{}.c", payload), TokenSegment::Signature),
    ] {
        match extract_claims(&token) {
            Err(IdTokenError::DecodeError { segment, .. }) => assert_eq!(segment, expected_segment),
            other => panic!("unexpected result for {:?}: {:?}", token, other),
        }
    }
}

#[test]
fn test_extract_claims_invalid_json() {
    let raw_payloads: [&[u8]; 4] = [b"not json", b"", b"[\"email\"]", b"\"user@example.com\""];
    for raw_payload in raw_payloads {
        let token = format!("e30.{}.c2ln", encode_segment(raw_payload));
        match extract_claims(&token) {
            Err(IdTokenError::InvalidJson(_)) => {}
            other => panic!("unexpected result for {:?}: {:?}", raw_payload, other),
        }
    }
}

#[test]
fn test_extract_claims_missing_email() {
    for payload in [
        json!({"sub": "123"}),
        json!({"email": ""}),
        json!({"email": null}),
        json!({"email": 42}),
    ] {
        match extract_claims(&token_with_payload(&payload)) {
            Err(IdTokenError::MissingEmail) => {}
            other => panic!("unexpected result for {}: {:?}", payload, other),
        }
    }
}

#[test]
fn test_claims_try_from_value() {
    let claims = IdTokenClaims::try_from(json!({"email": "a@x.com", "hd": 7}))
        .expect("failed to build claims");
    assert_eq!(claims.email(), "a@x.com");
    assert_eq!(claims.hosted_domain(), None);

    match IdTokenClaims::try_from(json!(["a@x.com"])) {
        Err(IdTokenError::InvalidJson(_)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_claims_serde_transparent() {
    let claims = IdTokenClaims::try_from(json!({"email": "a@x.com"})).expect("valid claims");
    assert_eq!(
        serde_json::to_string(&claims).expect("failed to serialize"),
        r#"{"email":"a@x.com"}"#
    );
}
