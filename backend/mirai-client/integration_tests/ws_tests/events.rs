use crate::ws_tests::helpers::{ServerScript, TestServer, event_frame};

use mirai_client::{Authentication, ClientOptions, MiraiClient};

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

const WAIT: Duration = Duration::from_secs(1);

/// Subscribe with a listener that forwards every event into a channel.
fn channel_listener(client: &MiraiClient) -> mpsc::UnboundedReceiver<Value> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.subscribe(move |event| {
        let _ = tx.send(event.clone());
    });
    rx
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    timeout(WAIT, rx.recv())
        .await
        .expect("No event within the wait time")
        .expect("Listener gone")
}

/// **VALUE**: Verifies reserved-id frames reach subscribers with the exact
/// payload, in registration order.
///
/// **WHY THIS MATTERS**: The event stream is the push half of the protocol;
/// consumers match on raw payload fields (`type`, account ids) and rely on
/// deterministic ordering between layered listeners.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Reserved-id frames are treated as responses and dropped
/// - The payload is rewrapped or filtered on the way to listeners
/// - Later subscribers receive the event before earlier ones
#[tokio::test]
async fn given_two_subscribers_when_event_pushed_then_both_receive_exact_payload_in_order() {
    let server = TestServer::start(ServerScript::auth_ok("S1")).await;
    let client = MiraiClient::new();
    client
        .connect(&server.address, Authentication::verify_key("abc", 123))
        .await
        .expect("Connect should succeed");

    let (order_tx, mut order_rx) = mpsc::unbounded_channel();
    let first_tx = order_tx.clone();
    client.subscribe(move |event| {
        let _ = first_tx.send(("first", event.clone()));
    });
    client.subscribe(move |event| {
        let _ = order_tx.send(("second", event.clone()));
    });

    let payload = json!({ "type": "BotOnlineEvent", "qq": 123 });
    server.push_frame(event_frame(payload.clone()));

    let (label, event) = timeout(WAIT, order_rx.recv())
        .await
        .expect("No event within the wait time")
        .expect("Listener gone");
    assert_eq!(label, "first");
    assert_eq!(event, payload);

    let (label, event) = timeout(WAIT, order_rx.recv())
        .await
        .expect("No event within the wait time")
        .expect("Listener gone");
    assert_eq!(label, "second");
    assert_eq!(event, payload);
}

/// **VALUE**: Verifies the reserved event id is configurable end to end.
///
/// **WHY THIS MATTERS**: The reserved id is negotiated with the server
/// deployment; a client pinned to `"-1"` misclassifies every frame on
/// deployments that chose a different tag.
///
/// **BUG THIS CATCHES**: The default id being hardcoded in the frame
/// classifier instead of read from the options.
#[tokio::test]
async fn given_custom_reserved_id_when_event_pushed_then_delivered_as_event() {
    let server = TestServer::start(ServerScript::auth_ok("S1")).await;
    let options = ClientOptions::default().with_reserved_sync_id("evt");
    let client = MiraiClient::with_options(options);
    client
        .connect(&server.address, Authentication::verify_key("abc", 123))
        .await
        .expect("Connect should succeed");

    let mut events = channel_listener(&client);

    let payload = json!({ "type": "BotOfflineEventActive" });
    server.push_frame(json!({ "syncId": "evt", "data": payload.clone() }));

    assert_eq!(recv(&mut events).await, payload);
}

/// **VALUE**: Verifies an unsubscribed listener receives nothing while the
/// remaining one still does.
///
/// **WHY THIS MATTERS**: Unsubscribe is the only way for a consumer to stop
/// the flow; delivery after removal means use-after-teardown in consumers
/// that free their state on unsubscribe.
///
/// **BUG THIS CATCHES**: The subscription handle removing the wrong entry.
#[tokio::test]
async fn given_unsubscribed_listener_when_event_pushed_then_only_remaining_listener_delivered() {
    let server = TestServer::start(ServerScript::auth_ok("S1")).await;
    let client = MiraiClient::new();
    client
        .connect(&server.address, Authentication::verify_key("abc", 123))
        .await
        .expect("Connect should succeed");

    let (removed_tx, mut removed_rx) = mpsc::unbounded_channel::<Value>();
    let id = client.subscribe(move |event| {
        let _ = removed_tx.send(event.clone());
    });
    let mut kept = channel_listener(&client);

    assert!(client.unsubscribe(id));

    server.push_frame(event_frame(json!({ "type": "BotOnlineEvent" })));

    recv(&mut kept).await;
    assert!(
        removed_rx.try_recv().is_err(),
        "the removed listener must receive nothing"
    );
}

/// **VALUE**: Verifies authentication starts a fresh session: listeners
/// registered before `connect` are dropped at the handshake.
///
/// **WHY THIS MATTERS**: The acknowledgement wipes correlation and listener
/// state so nothing from a previous (or premature) registration leaks into
/// the new session. Subscribing is an after-connect operation.
///
/// **BUG THIS CATCHES**: The handshake path forgetting to clear the hub,
/// silently blessing pre-connect subscriptions that the documented contract
/// says do not survive.
#[tokio::test]
async fn given_subscriber_registered_before_connect_then_dropped_at_handshake() {
    let server = TestServer::start(ServerScript::auth_ok("S1")).await;
    let client = MiraiClient::new();

    let (early_tx, mut early_rx) = mpsc::unbounded_channel::<Value>();
    client.subscribe(move |event| {
        let _ = early_tx.send(event.clone());
    });

    client
        .connect(&server.address, Authentication::verify_key("abc", 123))
        .await
        .expect("Connect should succeed");

    let mut late = channel_listener(&client);

    server.push_frame(event_frame(json!({ "type": "BotOnlineEvent" })));

    recv(&mut late).await;
    assert!(
        early_rx.try_recv().is_err(),
        "pre-connect subscriptions must not survive the handshake"
    );
}

/// **VALUE**: Verifies a locally emitted event is indistinguishable from a
/// pushed one.
///
/// **WHY THIS MATTERS**: Synthesized events let collaborators replay cached
/// state through the same listener path the live stream uses; two delivery
/// paths would mean two sets of ordering and panic-isolation rules.
///
/// **BUG THIS CATCHES**: Local emission bypassing the hub or mutating the
/// payload.
#[tokio::test]
async fn given_local_emit_when_subscribed_then_listener_receives_payload() {
    let client = MiraiClient::new();
    let mut events = channel_listener(&client);

    let payload = json!({ "type": "SyntheticEvent", "value": 7 });
    client.emit_event(&payload);

    assert_eq!(recv(&mut events).await, payload);
}
