use crate::ws_tests::helpers::{ServerScript, TestServer, auth_failed_frame};

use mirai_client::{
    Authentication, ClientOptions, ConnectError, ConnectionState, MiraiClient,
};

use serde_json::json;
use tokio::time::Duration;

/// **VALUE**: Verifies the full happy path: upgrade with verify-key
/// credentials, code-0 acknowledgement, `Open` state, session key surfaced.
///
/// **WHY THIS MATTERS**: This is the sequence every deployment runs at
/// startup. If any step of it regresses, nothing else in the crate is
/// reachable.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Credentials are not appended to the upgrade query
/// - The empty-id acknowledgement is not routed to the connect waiter
/// - The session key is lost between the wire and the caller
/// - The state machine fails to reach `Open`
#[tokio::test]
async fn given_valid_verify_key_when_connect_then_open_with_session_key() {
    let mut server = TestServer::start(ServerScript::auth_ok("S1")).await;
    let client = MiraiClient::new();

    let auth = client
        .connect(&server.address, Authentication::verify_key("abc", 123))
        .await
        .expect("Connect should succeed");

    assert_eq!(auth.code, 0);
    assert_eq!(auth.session_key.as_deref(), Some("S1"));
    assert_eq!(client.state(), ConnectionState::Open);
    assert!(client.is_available());

    let uri = server.upgrade_uri().await;
    assert_eq!(uri, "/all?verifyKey=abc&qq=123");
}

/// **VALUE**: Verifies session resumption puts `sessionKey` on the upgrade
/// query instead of the pairing parameters.
///
/// **WHY THIS MATTERS**: Resume and pairing are different server endpoints
/// of the same path; the parameter set is the only thing distinguishing
/// them.
///
/// **BUG THIS CATCHES**: The resume variant leaking `verifyKey` or `qq`.
#[tokio::test]
async fn given_session_key_auth_when_connect_then_upgrade_query_has_session_key() {
    let mut server = TestServer::start(ServerScript::auth_ok("S1")).await;
    let client = MiraiClient::new();

    client
        .connect(&server.address, Authentication::session_key("S1"))
        .await
        .expect("Connect should succeed");

    let uri = server.upgrade_uri().await;
    assert_eq!(uri, "/all?sessionKey=S1");
}

/// **VALUE**: Verifies a nonzero acknowledgement code rejects the connect
/// attempt and closes the connection.
///
/// **WHY THIS MATTERS**: A wrong verify key must surface as a clear,
/// immediate error carrying the server's code, not as a client that looks
/// open but fails every call.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A nonzero code resolves `connect` successfully
/// - The state machine lands anywhere other than `Closed`
/// - The code is lost on the way to the caller
#[tokio::test]
async fn given_nonzero_auth_code_when_connect_then_handshake_rejected() {
    let server = TestServer::start(ServerScript::first_frame(auth_failed_frame(1))).await;
    let client = MiraiClient::new();

    let result = client
        .connect(&server.address, Authentication::verify_key("wrong", 123))
        .await;

    match result {
        Err(ConnectError::HandshakeRejected { code, message }) => {
            assert_eq!(code.0, 1);
            assert_eq!(message, "Incorrect verify key");
        }
        other => panic!("Expected HandshakeRejected, got {other:?}"),
    }
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(!client.is_available());
}

/// **VALUE**: Verifies the divergent failure shape: an error-coded response
/// frame on a non-empty correlation id while authentication is pending.
///
/// **WHY THIS MATTERS**: Some server versions report authentication failure
/// this way instead of through the empty-id acknowledgement. A client that
/// only handles one shape hangs until the handshake deadline on the other.
///
/// **BUG THIS CATCHES**: The pre-authentication response path discarding
/// error-shaped payloads instead of failing the connect attempt.
#[tokio::test]
async fn given_error_response_frame_during_handshake_when_connect_then_rejected() {
    let frame = json!({ "syncId": "99", "data": { "code": 1, "msg": "Auth failed" } });
    let server = TestServer::start(ServerScript::first_frame(frame)).await;
    let client = MiraiClient::new();

    let result = client
        .connect(&server.address, Authentication::verify_key("wrong", 123))
        .await;

    match result {
        Err(ConnectError::HandshakeRejected { code, .. }) => assert_eq!(code.0, 1),
        other => panic!("Expected HandshakeRejected, got {other:?}"),
    }
    assert_eq!(client.state(), ConnectionState::Closed);
}

/// **VALUE**: Verifies the handshake deadline fires when the server never
/// acknowledges.
///
/// **WHY THIS MATTERS**: A server that accepts the upgrade but never
/// authenticates (misconfigured adapter, wrong path) must not hang `connect`
/// forever.
///
/// **BUG THIS CATCHES**: The connect waiter being awaited without a
/// deadline, or the state machine staying `Connecting` after the timeout.
#[tokio::test]
async fn given_silent_server_when_connect_then_handshake_timeout() {
    let server = TestServer::start(ServerScript::silent()).await;
    let options = ClientOptions::default().with_max_wait_time(Duration::from_millis(200));
    let client = MiraiClient::with_options(options);

    let result = client
        .connect(&server.address, Authentication::verify_key("abc", 123))
        .await;

    match result {
        Err(ConnectError::HandshakeTimeout { waited_ms, .. }) => assert_eq!(waited_ms, 200),
        other => panic!("Expected HandshakeTimeout, got {other:?}"),
    }
    assert_eq!(client.state(), ConnectionState::Closed);
}

/// **VALUE**: Verifies connect-while-open is refused without disturbing the
/// existing connection.
///
/// **WHY THIS MATTERS**: A connection instance owns exactly one socket and
/// one handshake waiter; a second concurrent connect would orphan one of
/// them.
///
/// **BUG THIS CATCHES**: The state gate at the top of `connect` going
/// missing, letting a second socket replace the first mid-session.
#[tokio::test]
async fn given_open_connection_when_connect_again_then_already_connected() {
    let server = TestServer::start(ServerScript::auth_ok("S1")).await;
    let client = MiraiClient::new();

    client
        .connect(&server.address, Authentication::verify_key("abc", 123))
        .await
        .expect("First connect should succeed");

    let result = client
        .connect(&server.address, Authentication::verify_key("abc", 123))
        .await;
    assert!(matches!(result, Err(ConnectError::AlreadyConnected { .. })));
    assert_eq!(client.state(), ConnectionState::Open);
}

/// **VALUE**: Verifies disconnect closes the socket once and only once.
///
/// **WHY THIS MATTERS**: Shutdown paths run disconnect defensively from
/// several places; the second invocation must fail locally instead of
/// touching a socket that is gone.
///
/// **BUG THIS CATCHES**: The sink not being taken on disconnect, making the
/// second call close a dangling half.
#[tokio::test]
async fn given_open_connection_when_disconnected_then_closed_and_second_disconnect_fails() {
    let server = TestServer::start(ServerScript::auth_ok("S1")).await;
    let client = MiraiClient::new();

    client
        .connect(&server.address, Authentication::verify_key("abc", 123))
        .await
        .expect("Connect should succeed");

    client.disconnect().await.expect("Disconnect should succeed");
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(!client.is_available());

    let result = client.disconnect().await;
    assert!(matches!(result, Err(ConnectError::NotConnected { .. })));
}
