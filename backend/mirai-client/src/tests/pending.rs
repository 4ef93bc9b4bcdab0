// Unit tests for the pending-call table and the sync-id source.

use crate::pending::{PendingCalls, SyncIdSource};

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

/// **VALUE**: Verifies the basic register/settle handoff.
///
/// **WHY THIS MATTERS**: This is the correlation mechanism every call rides
/// on; if a settled payload does not reach the registered receiver, every
/// call times out.
///
/// **BUG THIS CATCHES**: The sender being dropped instead of invoked, or the
/// entry not being removed on settle.
#[tokio::test]
async fn given_registered_call_when_settled_then_receiver_gets_payload() {
    let pending = PendingCalls::new();
    let receiver = pending.register("42".to_string());
    assert_eq!(pending.outstanding(), 1);

    assert!(pending.settle("42", json!({ "ok": true })));
    assert_eq!(pending.outstanding(), 0);

    let data = receiver.await.unwrap();
    assert_eq!(data["ok"], true);
}

/// **VALUE**: Verifies that settling an unknown id is a silent no-op.
///
/// **WHY THIS MATTERS**: Late responses for timed-out calls, and responses
/// with ids we never issued, must be dropped without disturbing anything.
///
/// **BUG THIS CATCHES**: A panic or spurious insert on an unknown id.
#[tokio::test]
async fn given_unknown_id_when_settled_then_no_op_returning_false() {
    let pending = PendingCalls::new();
    let _receiver = pending.register("1".to_string());

    assert!(!pending.settle("999", json!({})));
    assert_eq!(pending.outstanding(), 1);
}

/// **VALUE**: Verifies the timeout path removes the entry so a late response
/// has no observable effect.
///
/// **WHY THIS MATTERS**: A stale entry left behind would let a late response
/// for an expired call linger in the table and leak a sender for every call
/// that ever timed out.
///
/// **BUG THIS CATCHES**: `remove` leaving the entry in place, turning the
/// subsequent settle into a delivery.
#[tokio::test]
async fn given_removed_call_when_late_response_settles_then_discarded() {
    let pending = PendingCalls::new();
    let receiver = pending.register("7".to_string());

    assert!(pending.remove("7"));
    assert!(!pending.remove("7"), "second removal must be a no-op");

    // The late response finds no entry.
    assert!(!pending.settle("7", json!({ "late": true })));
    assert!(receiver.await.is_err(), "waiter must observe cancellation");
}

/// **VALUE**: Verifies that responses delivered in any permuted order each
/// resolve their own call exactly once.
///
/// **WHY THIS MATTERS**: Many calls are outstanding concurrently over one
/// socket and the server answers in whatever order it likes; correlation by
/// id is the whole point of the table.
///
/// **BUG THIS CATCHES**: Cross-delivery between outstanding calls.
#[tokio::test]
async fn given_concurrent_calls_when_settled_in_reverse_order_then_each_gets_its_own_result() {
    let pending = PendingCalls::new();
    let receivers: Vec<_> = (0..10)
        .map(|n| (n, pending.register(n.to_string())))
        .collect();

    for n in (0..10).rev() {
        assert!(pending.settle(&n.to_string(), json!({ "n": n })));
    }

    for (n, receiver) in receivers {
        let data = receiver.await.unwrap();
        assert_eq!(data["n"], n);
    }
    assert_eq!(pending.outstanding(), 0);
}

/// **VALUE**: Verifies `clear` fails all waiters promptly.
///
/// **WHY THIS MATTERS**: On socket close or re-authentication the table is
/// wiped; waiters must observe a failure rather than hang until their
/// individual deadlines.
///
/// **BUG THIS CATCHES**: Entries surviving `clear`, leaking a previous
/// session's handlers into the next one.
#[tokio::test]
async fn given_outstanding_calls_when_cleared_then_all_waiters_fail() {
    let pending = PendingCalls::new();
    let first = pending.register("1".to_string());
    let second = pending.register("2".to_string());

    pending.clear();

    assert_eq!(pending.outstanding(), 0);
    assert!(first.await.is_err());
    assert!(second.await.is_err());
}

/// **VALUE**: Verifies sync ids are unique even when generated from many
/// tasks inside the same millisecond.
///
/// **WHY THIS MATTERS**: The original protocol used wall-clock milliseconds
/// as ids; two calls in the same millisecond collided and one response was
/// silently mis-delivered. The monotonic source exists to make that
/// impossible.
///
/// **BUG THIS CATCHES**: The counter being replaced by a timestamp, or a
/// non-atomic increment.
#[test]
fn given_many_threads_when_generating_ids_then_all_unique() {
    let source = Arc::new(SyncIdSource::new());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let source = Arc::clone(&source);
        handles.push(std::thread::spawn(move || {
            (0..1000).map(|_| source.next()).collect::<Vec<_>>()
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "duplicate sync id generated");
        }
    }
    assert_eq!(seen.len(), 8000);
}

/// **VALUE**: Verifies an id is never reused while its call is outstanding.
///
/// **WHY THIS MATTERS**: Reuse before settlement would mis-deliver one
/// call's response to another; the monotonic source never returns the same
/// value twice, so reuse cannot happen at all.
///
/// **BUG THIS CATCHES**: A wrap-around or reset of the counter.
#[test]
fn given_sequential_generation_when_compared_then_strictly_increasing() {
    let source = SyncIdSource::new();
    let first: u64 = source.next().parse().unwrap();
    let second: u64 = source.next().parse().unwrap();
    let third: u64 = source.next().parse().unwrap();
    assert!(first < second && second < third);
}
