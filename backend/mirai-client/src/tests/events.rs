// Unit tests for the event fan-out hub.

use crate::events::EventHub;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

/// **VALUE**: Verifies delivery to every subscriber in registration order.
///
/// **WHY THIS MATTERS**: Collaborators layer caches on top of the event
/// stream and rely on deterministic ordering between, say, a logger
/// registered first and a state cache registered second.
///
/// **BUG THIS CATCHES**: A set-backed listener store losing registration
/// order.
#[test]
fn given_two_subscribers_when_published_then_both_receive_in_order() {
    let hub = EventHub::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let first_order = Arc::clone(&order);
    hub.subscribe(move |_| first_order.lock().unwrap().push("first"));
    let second_order = Arc::clone(&order);
    hub.subscribe(move |_| second_order.lock().unwrap().push("second"));

    hub.publish(&json!({ "type": "BotOnlineEvent" }));

    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}

/// **VALUE**: Verifies the payload reaches listeners unmodified.
///
/// **WHY THIS MATTERS**: The hub distributes a reference to the exact
/// inbound payload; any cloning-with-normalization would break consumers
/// that match on raw fields.
///
/// **BUG THIS CATCHES**: Payload mutation or field filtering in the hub.
#[test]
fn given_subscriber_when_event_published_then_exact_payload_delivered() {
    let hub = EventHub::new();
    let received = Arc::new(Mutex::new(None));

    let sink = Arc::clone(&received);
    hub.subscribe(move |event| *sink.lock().unwrap() = Some(event.clone()));

    let event = json!({ "type": "BotOnlineEvent", "qq": 123 });
    hub.publish(&event);

    assert_eq!(received.lock().unwrap().as_ref(), Some(&event));
}

/// **VALUE**: Verifies unsubscribing one listener from inside another's
/// callback does not skip delivery in the same pass.
///
/// **WHY THIS MATTERS**: Listeners routinely unsubscribe themselves or
/// peers in reaction to an event. Iterating the live list while it shrinks
/// would skip the neighbor of the removed entry.
///
/// **BUG THIS CATCHES**: Dispatch iterating the shared list instead of a
/// snapshot.
#[test]
fn given_unsubscribe_during_dispatch_when_published_then_other_listener_still_delivered() {
    let hub = Arc::new(EventHub::new());
    let delivered = Arc::new(AtomicUsize::new(0));

    let second_id = Arc::new(Mutex::new(None));

    let hub_handle = Arc::clone(&hub);
    let id_slot = Arc::clone(&second_id);
    let first_count = Arc::clone(&delivered);
    hub.subscribe(move |_| {
        first_count.fetch_add(1, Ordering::SeqCst);
        // Remove the *other* listener mid-dispatch.
        if let Some(id) = *id_slot.lock().unwrap() {
            hub_handle.unsubscribe(id);
        }
    });

    let second_count = Arc::clone(&delivered);
    let id = hub.subscribe(move |_| {
        second_count.fetch_add(1, Ordering::SeqCst);
    });
    *second_id.lock().unwrap() = Some(id);

    hub.publish(&json!({}));
    assert_eq!(
        delivered.load(Ordering::SeqCst),
        2,
        "both listeners must run in the pass during which one was removed"
    );

    // The removal takes effect for the next pass.
    hub.publish(&json!({}));
    assert_eq!(delivered.load(Ordering::SeqCst), 3);
}

/// **VALUE**: Verifies a subscription made during dispatch joins the next
/// pass, not the current one.
///
/// **WHY THIS MATTERS**: Delivering to listeners registered after the event
/// arrived would hand them an event from before their subscription, which
/// double-delivers once the publisher retries.
///
/// **BUG THIS CATCHES**: The snapshot being taken lazily per listener.
#[test]
fn given_subscribe_during_dispatch_when_published_then_new_listener_joins_next_pass() {
    let hub = Arc::new(EventHub::new());
    let late_deliveries = Arc::new(AtomicUsize::new(0));

    let hub_handle = Arc::clone(&hub);
    let late_count = Arc::clone(&late_deliveries);
    hub.subscribe(move |_| {
        let late_count = Arc::clone(&late_count);
        hub_handle.subscribe(move |_| {
            late_count.fetch_add(1, Ordering::SeqCst);
        });
    });

    hub.publish(&json!({}));
    assert_eq!(late_deliveries.load(Ordering::SeqCst), 0);

    hub.publish(&json!({}));
    assert_eq!(late_deliveries.load(Ordering::SeqCst), 1);
}

/// **VALUE**: Verifies a panicking listener does not block the others.
///
/// **WHY THIS MATTERS**: No error in one listener may prevent delivery to
/// the rest; a single buggy subscriber must not take the event stream down
/// for everyone.
///
/// **BUG THIS CATCHES**: The unwind guard being removed, killing the reader
/// task on the first bad listener.
#[test]
fn given_panicking_listener_when_published_then_remaining_listeners_delivered() {
    let hub = EventHub::new();
    let delivered = Arc::new(AtomicUsize::new(0));

    hub.subscribe(|_| panic!("listener bug"));
    let count = Arc::clone(&delivered);
    hub.subscribe(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    hub.publish(&json!({}));
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

/// **VALUE**: Verifies unsubscribe semantics and the clear-on-close path.
///
/// **WHY THIS MATTERS**: `clear` implements the implicit unsubscribe when a
/// connection closes or a new session is established; leftover listeners
/// would receive events from a session they never subscribed to.
///
/// **BUG THIS CATCHES**: `unsubscribe` reporting success for unknown ids, or
/// `clear` leaving listeners behind.
#[test]
fn given_subscribers_when_unsubscribed_and_cleared_then_counts_reflect_it() {
    let hub = EventHub::new();
    let id = hub.subscribe(|_| {});
    hub.subscribe(|_| {});
    assert_eq!(hub.subscriber_count(), 2);

    assert!(hub.unsubscribe(id));
    assert!(!hub.unsubscribe(id), "second unsubscribe must return false");
    assert_eq!(hub.subscriber_count(), 1);

    hub.clear();
    assert_eq!(hub.subscriber_count(), 0);
}
