//! End-to-end scenarios over the in-memory store and registry, without a
//! live transport.

mod common;

use arcadia::backend::store::SocialStore;
use arcadia::shared::protocol::{
    AcceptedPayload, PresenceStatus, RelationStatus, ServerMessage, UserRef,
};
use assert_matches::assert_matches;
use common::{connect_user, realtime_with_users};
use tokio::sync::mpsc::error::TryRecvError;

/// Scenario 1: both parties online; the full request/accept handshake
/// lands notifications on both sides and an accepted durable relation.
#[tokio::test]
async fn test_request_accept_flow_with_both_online() {
    let rt = realtime_with_users(&[(1, "a"), (2, "b")]);
    let (mut a_rx, _) = connect_user(&rt.registry, 1);
    let (mut b_rx, _) = connect_user(&rt.registry, 2);

    rt.notifier.send_request(1, 2).await.unwrap();

    let received = b_rx.recv().await.unwrap();
    assert_eq!(
        received,
        ServerMessage::FriendRequestReceived {
            from: UserRef {
                id: 1,
                username: "a".to_string(),
            },
        }
    );

    // The sender gets a confirmation.
    assert_matches!(
        a_rx.recv().await.unwrap(),
        ServerMessage::FriendRequestSent { friend_id: 2, .. }
    );

    rt.notifier.respond(1, 2, true).await.unwrap();

    let accepted = a_rx.recv().await.unwrap();
    assert_matches!(
        accepted,
        ServerMessage::FriendRequestAccepted(AcceptedPayload::ToRequester { ref friend })
            if friend.id == 2 && friend.username == "b"
    );
    assert_matches!(
        b_rx.recv().await.unwrap(),
        ServerMessage::FriendRequestAccepted(AcceptedPayload::ToAccepter { friend_id: 1, .. })
    );

    let relation = rt.store.accepted_relation(1, 2).await.unwrap().unwrap();
    assert_eq!(relation.status, RelationStatus::Accepted);
}

/// Scenario 2: the recipient is offline. Nothing travels over the channel
/// for them and nothing is queued; their next session must discover the
/// pending request through the pull-based endpoints.
#[tokio::test]
async fn test_request_to_offline_recipient_delivers_nothing() {
    let rt = realtime_with_users(&[(1, "a"), (2, "b")]);
    let (mut a_rx, _) = connect_user(&rt.registry, 1);

    rt.notifier.send_request(1, 2).await.unwrap();

    // The durable relation exists even though no notification went out.
    let relation = rt.store.pending_relation(1, 2).await.unwrap().unwrap();
    assert_eq!(relation.status, RelationStatus::Pending);

    // B comes online later: the registry hands them the online set only.
    let (mut b_rx, _) = connect_user(&rt.registry, 2);
    assert_matches!(b_rx.try_recv(), Err(TryRecvError::Empty));

    // The sender still got its confirmation at send time.
    assert_matches!(
        a_rx.recv().await.unwrap(),
        ServerMessage::FriendRequestSent { friend_id: 2, .. }
    );
}

/// Scenario 3: an abnormal drop followed by a reconnect leaves exactly one
/// registry entry for the user, and the stale connection's teardown does
/// not evict the fresh session.
#[tokio::test]
async fn test_reconnect_leaves_single_registry_entry() {
    let rt = realtime_with_users(&[(1, "a")]);

    let (_stale_rx, stale_id) = connect_user(&rt.registry, 1);
    // The client reconnects before the server notices the dead socket.
    let (_fresh_rx, fresh_id) = connect_user(&rt.registry, 1);

    assert_eq!(rt.registry.snapshot(), vec![1]);
    assert_eq!(rt.registry.lookup(1).unwrap().connection_id(), fresh_id);

    // The stale socket's teardown arrives late and must be a no-op.
    assert_eq!(rt.registry.remove(stale_id), None);
    assert_eq!(rt.registry.snapshot(), vec![1]);
    assert_eq!(rt.registry.lookup(1).unwrap().connection_id(), fresh_id);

    // A real disconnect of the fresh session clears the entry.
    assert_eq!(rt.registry.remove(fresh_id), Some(1));
    assert!(rt.registry.snapshot().is_empty());
}

/// Presence fan-out reaches only accepted friends who are online at the
/// moment of the transition.
#[tokio::test]
async fn test_presence_fanout_targets_online_friends_only() {
    let rt = realtime_with_users(&[(1, "a"), (2, "b"), (3, "c")]);

    rt.notifier.send_request(1, 2).await.unwrap();
    rt.notifier.respond(1, 2, true).await.unwrap();
    // User 3 is not a friend of user 1.

    let (mut b_rx, _) = connect_user(&rt.registry, 2);
    let (mut c_rx, _) = connect_user(&rt.registry, 3);

    rt.coordinator.on_authenticated(1).await;

    assert_eq!(
        b_rx.recv().await.unwrap(),
        ServerMessage::FriendStatusChange {
            friend_id: 1,
            status: PresenceStatus::Online,
        }
    );
    assert_matches!(c_rx.try_recv(), Err(TryRecvError::Empty));
}

/// A removal mutates the relation even when the counterparty is offline;
/// only the initiator hears the echo.
#[tokio::test]
async fn test_remove_with_offline_counterparty_still_mutates() {
    let rt = realtime_with_users(&[(1, "a"), (2, "b")]);
    rt.notifier.send_request(1, 2).await.unwrap();
    rt.notifier.respond(1, 2, true).await.unwrap();

    let (mut a_rx, _) = connect_user(&rt.registry, 1);
    rt.notifier.remove(1, 2).await.unwrap();

    assert!(rt.store.accepted_relation(1, 2).await.unwrap().is_none());
    assert_eq!(
        a_rx.recv().await.unwrap(),
        ServerMessage::FriendRemoved { friend_id: 2 }
    );
}
