#![allow(dead_code)]

use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use oidc_domain_gate::{Domain, DomainPolicy, MemoryFlowState, OidcSettings, DATA_STATE_KEY};
use serde_json::{json, Value};

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, Once};

static INIT_LOG: Once = Once::new();

thread_local! {
    static TEST_ID: RefCell<&'static str> = RefCell::new("UNINITIALIZED_TEST_ID");
}

pub fn get_test_id() -> &'static str {
    TEST_ID.with(|id| *id.borrow())
}

pub fn set_test_id(test_id: &'static str) {
    TEST_ID.with(|id| *id.borrow_mut() = test_id);
}

fn _init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn init_log(test_id: &'static str) {
    INIT_LOG.call_once(_init_log);
    set_test_id(test_id);
}

/// Builds an unsigned compact token around `payload`.
pub fn id_token(payload: &Value) -> String {
    format!(
        "{}.{}.{}",
        BASE64_URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"k1"}"#),
        BASE64_URL_SAFE_NO_PAD.encode(payload.to_string()),
        BASE64_URL_SAFE_NO_PAD.encode("signature")
    )
}

/// Flow state as the host leaves it after the token exchange.
pub fn token_response_state(id_token: &str) -> MemoryFlowState {
    MemoryFlowState::new().with_state(
        DATA_STATE_KEY,
        json!({
            "access_token": "access-token",
            "token_type": "Bearer",
            "refresh_token": "refresh-token",
            "expires_in": 3600,
            "id_token": id_token,
        }),
    )
}

pub fn settings(allowlist: &[&str], blocklist: &[&str]) -> Arc<OidcSettings> {
    let to_set = |names: &[&str]| names.iter().copied().map(Domain::from).collect::<HashSet<_>>();
    Arc::new(
        OidcSettings::new()
            .set_domain_policy(DomainPolicy::new(to_set(allowlist), to_set(blocklist))),
    )
}
