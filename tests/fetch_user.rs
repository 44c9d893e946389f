use oidc_domain_gate::{
    AuthRequest, AuthStep, FlowState, MemoryFlowState, OidcProvider, ProviderConfig,
    StepOutcome, DATA_VERSION, DOMAIN_STATE_KEY, ERR_INVALID_RESPONSE, USER_STATE_KEY,
};
use pretty_assertions::assert_eq;
use serde_json::json;

mod common;

use common::{get_test_id, id_token, init_log, settings, token_response_state};

#[test]
fn test_legacy_provider_success() {
    init_log("legacy_provider_success");

    let payload = json!({
        "iss": "https://accounts.example.com",
        "sub": "10769150350006150715113082367",
        "email": "jsmith@x.com",
        "email_verified": true,
    });
    let mut state = token_response_state(&id_token(&payload));
    let provider = OidcProvider::new(settings(&[], &[]), ProviderConfig::new());

    let outcome = provider
        .fetch_user_step()
        .dispatch(&AuthRequest::new(get_test_id()), &mut state);

    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(state.fetch_state(DOMAIN_STATE_KEY), Some(&json!("x.com")));
    assert_eq!(state.fetch_state(USER_STATE_KEY), Some(&payload));
}

#[test]
fn test_missing_id_token() {
    init_log("missing_id_token");

    let mut state = MemoryFlowState::new().with_state(
        "data",
        json!({"access_token": "access-token", "token_type": "Bearer"}),
    );
    let before = state.clone();
    let provider = OidcProvider::new(settings(&[], &[]), ProviderConfig::new());

    let outcome = provider
        .fetch_user_step()
        .dispatch(&AuthRequest::new(get_test_id()), &mut state);

    assert_eq!(
        outcome,
        StepOutcome::Terminate(ERR_INVALID_RESPONSE.to_string())
    );
    assert_eq!(state, before);
}

#[test]
fn test_blocked_hosted_domain() {
    init_log("blocked_hosted_domain");

    let mut state = token_response_state(&id_token(
        &json!({"email": "mallory@blocked.com", "hd": "blocked.com"}),
    ));
    let before = state.clone();
    let provider = OidcProvider::new(
        settings(&[], &["blocked.com"]),
        ProviderConfig::new().set_version(Some(DATA_VERSION.to_string())),
    );

    match provider
        .fetch_user_step()
        .dispatch(&AuthRequest::new(get_test_id()), &mut state)
    {
        StepOutcome::Terminate(message) => assert!(
            message.contains("blocked.com"),
            "unexpected message: {}",
            message
        ),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(state, before);
}

#[test]
fn test_hosted_domain_ignores_email() {
    init_log("hosted_domain_ignores_email");

    let provider = OidcProvider::new(
        settings(&["example.com"], &[]),
        ProviderConfig::new().set_version(Some(DATA_VERSION.to_string())),
    );
    let step = provider.fetch_user_step();

    // Personal address on an allowed hosted domain.
    let mut state = token_response_state(&id_token(
        &json!({"email": "jane@gmail.com", "hd": "example.com"}),
    ));
    assert_eq!(
        step.dispatch(&AuthRequest::new(get_test_id()), &mut state),
        StepOutcome::Continue
    );
    assert_eq!(state.fetch_state(DOMAIN_STATE_KEY), Some(&json!("example.com")));

    // Allowed email domain but no hosted domain.
    let mut state = token_response_state(&id_token(&json!({"email": "jane@example.com"})));
    assert_eq!(
        step.dispatch(&AuthRequest::new(get_test_id()), &mut state),
        StepOutcome::Terminate("invalid domain: ".to_string())
    );
    assert_eq!(state.fetch_state(DOMAIN_STATE_KEY), None);
}

#[test]
fn test_undecodable_tokens() {
    init_log("undecodable_tokens");

    let provider = OidcProvider::new(settings(&[], &[]), ProviderConfig::new());
    let step = provider.fetch_user_step();
    let valid = id_token(&json!({"email": "a@x.com"}));
    let (header, rest) = valid.split_once('.').expect("token has no header");
    let signed = &valid[..valid.rfind('.').expect("token has no signature")];

    for token in [
        "".to_string(),
        "header.payload".to_string(),
        format!("{}.c", signed),
        format!("{}.sig.cc", signed),
        format!("{}xx.{}", header, rest),
    ] {
        let mut state = token_response_state(&token);
        assert_eq!(
            step.dispatch(&AuthRequest::new(get_test_id()), &mut state),
            StepOutcome::Terminate(ERR_INVALID_RESPONSE.to_string()),
            "token {:?}",
            token
        );
        assert_eq!(state.fetch_state(USER_STATE_KEY), None);
    }
}

#[test]
fn test_dotted_signature_accepted() {
    init_log("dotted_signature_accepted");

    let provider = OidcProvider::new(settings(&["x.com"], &[]), ProviderConfig::new());
    let token = format!("{}.c2ln.c2ln", id_token(&json!({"email": "a@x.com"})));
    let mut state = token_response_state(&token);

    assert_eq!(
        provider
            .fetch_user_step()
            .dispatch(&AuthRequest::new(get_test_id()), &mut state),
        StepOutcome::Continue
    );
    assert_eq!(state.fetch_state(DOMAIN_STATE_KEY), Some(&json!("x.com")));
}
