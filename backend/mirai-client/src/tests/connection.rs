// Unit tests for address building and the initial state machine position.
// Socket-driven lifecycle behavior is covered in integration_tests/.

use crate::connection::{Authentication, build_ws_address};
use crate::{ConnectionState, MiraiClient};

use crate::error::ConnectError;

/// **VALUE**: Verifies verify-key credentials land in the query string.
///
/// **WHY THIS MATTERS**: The server authenticates purely from the upgrade
/// request's query parameters; wrong names or missing `qq` fail the pairing
/// before any frame is exchanged.
///
/// **BUG THIS CATCHES**: Parameter renames or the account id being dropped.
#[test]
fn given_verify_key_auth_when_address_built_then_query_has_verify_key_and_qq() {
    let url = build_ws_address(
        "ws://localhost:8080/all",
        &Authentication::verify_key("abc", 123),
    )
    .unwrap();
    assert_eq!(url.as_str(), "ws://localhost:8080/all?verifyKey=abc&qq=123");
}

/// **VALUE**: Verifies session-key credentials build the resume address.
///
/// **WHY THIS MATTERS**: Session resumption uses a different parameter set;
/// sending `verifyKey` on resume is rejected by the server.
///
/// **BUG THIS CATCHES**: The two credential variants sharing one code path.
#[test]
fn given_session_key_auth_when_address_built_then_query_has_session_key() {
    let url = build_ws_address(
        "ws://localhost:8080/all",
        &Authentication::session_key("S1"),
    )
    .unwrap();
    assert_eq!(url.as_str(), "ws://localhost:8080/all?sessionKey=S1");
}

/// **VALUE**: Verifies an unparseable address fails locally.
///
/// **WHY THIS MATTERS**: A bad address must produce an immediate, clear
/// error, not a confusing socket failure.
///
/// **BUG THIS CATCHES**: The parse error being swallowed into a connect
/// attempt.
#[test]
fn given_invalid_address_when_built_then_invalid_address_error() {
    let result = build_ws_address("not a url", &Authentication::session_key("S1"));
    assert!(matches!(result, Err(ConnectError::InvalidAddress { .. })));
}

/// **VALUE**: Verifies credentials never leak through Debug formatting.
///
/// **WHY THIS MATTERS**: `Authentication` values travel through error paths
/// that get logged; the verify key is a long-lived secret.
///
/// **BUG THIS CATCHES**: A plain `String` replacing `RedactedKey` in the
/// credential enum.
#[test]
fn given_authentication_when_debug_formatted_then_secret_redacted() {
    let auth = Authentication::verify_key("super-secret", 123);
    let debug = format!("{auth:?}");
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("123"), "the account id is not a secret");
}

/// **VALUE**: Verifies a fresh client starts `Disconnected` and refuses
/// calls.
///
/// **WHY THIS MATTERS**: The state machine is the sole gate on `call`; its
/// initial position must refuse traffic with no socket behind it.
///
/// **BUG THIS CATCHES**: A default state of `Open`, which would turn every
/// early call into a hang instead of an immediate error.
#[tokio::test]
async fn given_fresh_client_when_inspected_then_disconnected_and_unavailable() {
    let client = MiraiClient::new();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(!client.is_available());
    assert_eq!(client.outstanding_calls(), 0);

    let result = client.call("groupList", None).await;
    assert!(matches!(
        result,
        Err(crate::error::CallError::NotConnected { .. })
    ));

    let result = client.disconnect().await;
    assert!(matches!(
        result,
        Err(ConnectError::NotConnected { .. })
    ));
}
