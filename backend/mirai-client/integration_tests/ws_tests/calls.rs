use crate::ws_tests::helpers::{ServerScript, TestServer, response_frame};

use mirai_client::{Authentication, CallError, ConnectionState, MiraiClient};

use serde_json::{Value, json};
use tokio::time::Duration;

async fn open_client(server: &TestServer) -> MiraiClient {
    let client = MiraiClient::new();
    client
        .connect(&server.address, Authentication::verify_key("abc", 123))
        .await
        .expect("Connect should succeed");
    client
}

fn sync_id_of(request: &Value) -> String {
    request["syncId"]
        .as_str()
        .expect("Request must carry a string syncId")
        .to_string()
}

/// **VALUE**: Verifies the end-to-end call path: envelope on the wire,
/// correlation by id, status stripped, operation result returned.
///
/// **WHY THIS MATTERS**: Every typed operation rides this path. The wire
/// envelope is a server-side contract (`subCommand` must be present even
/// when null, `content` absent when there is none).
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The outbound envelope drops or renames a field
/// - The response is not matched back to its call
/// - The code/msg wrapper leaks into the result
#[tokio::test]
async fn given_open_connection_when_call_then_wire_envelope_correct_and_result_unwrapped() {
    let script = ServerScript::auth_ok("S1").with_responder(|request| {
        vec![response_frame(
            request["syncId"].as_str().unwrap(),
            json!({ "code": 0, "msg": "", "data": [{ "id": 10, "name": "G" }] }),
        )]
    });
    let mut server = TestServer::start(script).await;
    let client = open_client(&server).await;

    let groups = client
        .call("groupList", None)
        .await
        .expect("Call should succeed");
    assert_eq!(groups[0]["id"], 10);

    let request = server.next_request().await;
    assert_eq!(request["command"], "groupList");
    assert_eq!(request["subCommand"], Value::Null);
    assert!(request["syncId"].is_string());
    assert!(
        request.get("content").is_none(),
        "content must be absent when the call carries none"
    );
}

/// **VALUE**: Verifies sub-command and content reach the wire unchanged.
///
/// **WHY THIS MATTERS**: Commands with `get`/`update` variants are
/// distinguished solely by `subCommand`; a dropped sub-command silently
/// turns an update into a read.
///
/// **BUG THIS CATCHES**: The optional fields being swapped or serialized
/// under the wrong names.
#[tokio::test]
async fn given_sub_command_and_content_when_called_then_both_on_the_wire() {
    let script = ServerScript::auth_ok("S1").with_responder(|request| {
        vec![response_frame(
            request["syncId"].as_str().unwrap(),
            json!({ "code": 0, "msg": "" }),
        )]
    });
    let mut server = TestServer::start(script).await;
    let client = open_client(&server).await;

    client
        .call_command(
            "memberInfo",
            Some("update"),
            Some(json!({ "target": 10, "memberId": 20 })),
            None,
        )
        .await
        .expect("Call should succeed");

    let request = server.next_request().await;
    assert_eq!(request["command"], "memberInfo");
    assert_eq!(request["subCommand"], "update");
    assert_eq!(request["content"]["target"], 10);
    assert_eq!(request["content"]["memberId"], 20);
}

/// **VALUE**: Verifies two concurrent calls each receive their own result
/// when the server answers in reverse order.
///
/// **WHY THIS MATTERS**: The whole point of multiplexing one socket is that
/// responses arrive in whatever order the server finishes them; correlation
/// must be by id, never by arrival order.
///
/// **BUG THIS CATCHES**: First-in-first-out matching, which passes every
/// single-call test and cross-delivers under load.
#[tokio::test]
async fn given_reverse_order_responses_when_two_calls_then_each_matched_by_id() {
    let mut held: Option<Value> = None;
    let script = ServerScript::auth_ok("S1").with_responder(move |request| {
        // Hold the first request; on the second, answer both reversed.
        match held.take() {
            None => {
                held = Some(request.clone());
                Vec::new()
            }
            Some(first) => vec![
                response_frame(
                    request["syncId"].as_str().unwrap(),
                    json!({ "code": 0, "msg": "", "data": { "order": "second" } }),
                ),
                response_frame(
                    first["syncId"].as_str().unwrap(),
                    json!({ "code": 0, "msg": "", "data": { "order": "first" } }),
                ),
            ],
        }
    });
    let server = TestServer::start(script).await;
    let client = open_client(&server).await;

    let (first, second) = tokio::join!(
        client.call("friendList", None),
        client.call("groupList", None),
    );

    assert_eq!(first.expect("First call should succeed")["order"], "first");
    assert_eq!(
        second.expect("Second call should succeed")["order"],
        "second"
    );
    assert_eq!(client.outstanding_calls(), 0);
}

/// **VALUE**: Verifies a nonzero status code fails the call with the mapped
/// message while the connection stays usable.
///
/// **WHY THIS MATTERS**: Remote errors are per-call outcomes, not transport
/// faults; one failed operation must not poison the socket or the calls
/// around it.
///
/// **BUG THIS CATCHES**: A remote error tearing the connection down, or the
/// code arriving as a success payload.
#[tokio::test]
async fn given_remote_error_code_when_called_then_remote_error_and_connection_stays_open() {
    let script = ServerScript::auth_ok("S1").with_responder(|request| {
        let code = if request["command"] == "sendFriendMessage" { 5 } else { 0 };
        vec![response_frame(
            request["syncId"].as_str().unwrap(),
            json!({ "code": code, "msg": "" }),
        )]
    });
    let server = TestServer::start(script).await;
    let client = open_client(&server).await;

    let result = client
        .call("sendFriendMessage", Some(json!({ "target": 1 })))
        .await;
    match result {
        Err(CallError::Remote { code, message }) => {
            assert_eq!(code.0, 5);
            assert_eq!(message, "The target does not exist");
        }
        other => panic!("Expected Remote error, got {other:?}"),
    }

    assert!(client.is_available());
    client
        .call("groupList", None)
        .await
        .expect("The next call must still work");
}

/// **VALUE**: Verifies the call deadline fires, the late response is
/// discarded, and the connection keeps serving subsequent calls.
///
/// **WHY THIS MATTERS**: Expiry must remove the correlation entry, so a
/// response arriving after the deadline finds nobody. Without that removal
/// the table leaks one entry per timed-out call.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The deadline never fires and the call hangs
/// - The entry survives expiry and the late response resurrects it
/// - A timeout wedges the connection for later calls
#[tokio::test]
async fn given_unanswered_call_when_deadline_fires_then_timeout_and_late_response_discarded() {
    let script = ServerScript::auth_ok("S1").with_responder(|request| {
        // Answer everything except the call under test.
        if request["command"] == "slowCommand" {
            Vec::new()
        } else {
            vec![response_frame(
                request["syncId"].as_str().unwrap(),
                json!({ "code": 0, "msg": "" }),
            )]
        }
    });
    let mut server = TestServer::start(script).await;
    let client = open_client(&server).await;

    let result = client
        .call_command("slowCommand", None, None, Some(Duration::from_millis(200)))
        .await;
    match result {
        Err(CallError::Timeout { waited_ms, .. }) => assert_eq!(waited_ms, 200),
        other => panic!("Expected Timeout, got {other:?}"),
    }
    assert_eq!(client.outstanding_calls(), 0, "expiry must remove the entry");

    // The response shows up after the deadline; it must go nowhere.
    let expired = server.next_request().await;
    server.push_frame(response_frame(
        &sync_id_of(&expired),
        json!({ "code": 0, "msg": "", "data": { "late": true } }),
    ));

    client
        .call("groupList", None)
        .await
        .expect("The connection must keep serving calls");
}

/// **VALUE**: Verifies an outstanding call fails fast when the server closes
/// the connection.
///
/// **WHY THIS MATTERS**: Waiters must observe the close immediately instead
/// of sitting out their full deadlines against a socket that is gone.
///
/// **BUG THIS CATCHES**: The close path not clearing the pending table,
/// leaving every outstanding call to time out one by one.
#[tokio::test]
async fn given_outstanding_call_when_server_closes_then_connection_closed_error() {
    let server = TestServer::start(ServerScript::auth_ok("S1")).await;
    let client = open_client(&server).await;

    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.call("groupList", None).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    server.close_connection();

    let result = pending.await.expect("Call task must not panic");
    assert!(matches!(result, Err(CallError::ConnectionClosed { .. })));
    assert_eq!(client.state(), ConnectionState::Closed);

    let result = client.call("groupList", None).await;
    assert!(matches!(result, Err(CallError::NotConnected { .. })));
}
