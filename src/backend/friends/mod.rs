//! Friendship Notifier
//!
//! Implements send/accept/reject/remove for friend relationships: each
//! operation mutates the durable relation, then pushes notifications to
//! whichever parties are reachable through the connection registry.
//!
//! "Relation not found" is a request error; "counterparty offline" is a
//! delivery degradation. The two are orthogonal: an operation can succeed
//! in mutating the relation while delivering nothing.

use std::sync::Arc;

use crate::backend::error::FriendshipError;
use crate::backend::presence::ConnectionRegistry;
use crate::backend::store::SocialStore;
use crate::shared::protocol::{
    AcceptedPayload, FriendProfile, PresenceStatus, RelationStatus, ServerMessage, UserRef,
};

pub struct FriendshipNotifier {
    store: Arc<dyn SocialStore>,
    registry: Arc<ConnectionRegistry>,
}

impl FriendshipNotifier {
    pub fn new(store: Arc<dyn SocialStore>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { store, registry }
    }

    /// Create a pending request from `requester_id` to `recipient_id`.
    ///
    /// Pushes `friend-request-received` to the recipient if online and a
    /// `friend-request-sent` confirmation to the requester (online
    /// delivery only; nothing is queued otherwise).
    pub async fn send_request(
        &self,
        requester_id: i64,
        recipient_id: i64,
    ) -> Result<(), FriendshipError> {
        if requester_id == recipient_id {
            return Err(FriendshipError::SelfRequest);
        }

        // Any existing relation between the pair, in either direction,
        // blocks a new request.
        if self
            .store
            .relation_between(requester_id, recipient_id)
            .await?
            .is_some()
        {
            return Err(FriendshipError::DuplicateRequest);
        }

        let relation = self.store.create_relation(requester_id, recipient_id).await?;
        tracing::info!(
            "[Friends] Request {} created: {} -> {}",
            relation.id,
            requester_id,
            recipient_id
        );

        if let Some(handle) = self.registry.lookup(recipient_id) {
            if let Some(requester) = self.store.get_user(requester_id).await? {
                handle.push(ServerMessage::FriendRequestReceived {
                    from: UserRef {
                        id: requester.id,
                        username: requester.username,
                    },
                });
            }
        }

        if let Some(handle) = self.registry.lookup(requester_id) {
            let friend_username = self
                .store
                .get_user(recipient_id)
                .await?
                .map(|u| u.username)
                .unwrap_or_default();
            handle.push(ServerMessage::FriendRequestSent {
                id: relation.id,
                friend_id: recipient_id,
                friend_username,
                status: relation.status,
            });
        }

        Ok(())
    }

    /// Resolve the pending request from `requester_id` to `recipient_id`.
    ///
    /// Accepting persists the relation and notifies both parties (each
    /// with its own payload shape). Rejecting hard-deletes the relation
    /// and notifies only the rejecting side; the requester learns nothing.
    pub async fn respond(
        &self,
        requester_id: i64,
        recipient_id: i64,
        accept: bool,
    ) -> Result<(), FriendshipError> {
        let relation = self
            .store
            .pending_relation(requester_id, recipient_id)
            .await?
            .ok_or(FriendshipError::NotFound)?;

        if accept {
            self.store.mark_accepted(relation.id).await?;
            tracing::info!("[Friends] Request {} accepted", relation.id);

            if let Some(handle) = self.registry.lookup(requester_id) {
                if let Some(accepter) = self.store.get_user(recipient_id).await? {
                    handle.push(ServerMessage::FriendRequestAccepted(
                        AcceptedPayload::ToRequester {
                            friend: FriendProfile {
                                id: accepter.id,
                                username: accepter.username,
                                avatar_url: accepter.avatar_url,
                                status: self.presence_of(recipient_id),
                            },
                        },
                    ));
                }
            }

            if let Some(handle) = self.registry.lookup(recipient_id) {
                handle.push(ServerMessage::FriendRequestAccepted(
                    AcceptedPayload::ToAccepter {
                        id: relation.id,
                        friend_id: requester_id,
                        status: RelationStatus::Accepted,
                    },
                ));
            }
        } else {
            self.store.delete_relation(relation.id).await?;
            tracing::info!("[Friends] Request {} rejected", relation.id);

            // Only the rejecting side hears about this.
            if let Some(handle) = self.registry.lookup(recipient_id) {
                handle.push(ServerMessage::FriendRequestRejected {
                    friend_id: requester_id,
                });
            }
        }

        Ok(())
    }

    /// Remove the accepted relation between `user_id` and `other_id`.
    pub async fn remove(&self, user_id: i64, other_id: i64) -> Result<(), FriendshipError> {
        let relation = self
            .store
            .accepted_relation(user_id, other_id)
            .await?
            .ok_or(FriendshipError::NotFound)?;

        self.store.delete_relation(relation.id).await?;
        tracing::info!(
            "[Friends] Relation {} removed by user {}",
            relation.id,
            user_id
        );

        if let Some(handle) = self.registry.lookup(other_id) {
            handle.push(ServerMessage::FriendRemoved { friend_id: user_id });
        }
        if let Some(handle) = self.registry.lookup(user_id) {
            handle.push(ServerMessage::FriendRemoved { friend_id: other_id });
        }

        Ok(())
    }

    fn presence_of(&self, user_id: i64) -> PresenceStatus {
        if self.registry.lookup(user_id).is_some() {
            PresenceStatus::Online
        } else {
            PresenceStatus::Offline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::presence::ConnectionHandle;
    use crate::backend::store::{MemoryStore, UserProfile};
    use assert_matches::assert_matches;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn seeded() -> (
        Arc<MemoryStore>,
        Arc<ConnectionRegistry>,
        FriendshipNotifier,
    ) {
        let store = Arc::new(MemoryStore::new());
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
            store.insert_user(UserProfile {
                id,
                username: name.to_string(),
                avatar_url: None,
                status: PresenceStatus::Offline,
            });
        }
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = FriendshipNotifier::new(store.clone(), registry.clone());
        (store, registry, notifier)
    }

    fn attach(registry: &ConnectionRegistry, user_id: i64) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(user_id, ConnectionHandle::new(Uuid::new_v4(), tx));
        rx
    }

    #[tokio::test]
    async fn test_self_request_fails() {
        let (_store, _registry, notifier) = seeded();
        assert_matches!(
            notifier.send_request(1, 1).await,
            Err(FriendshipError::SelfRequest)
        );
    }

    #[tokio::test]
    async fn test_duplicate_request_fails() {
        let (_store, _registry, notifier) = seeded();
        notifier.send_request(1, 2).await.unwrap();
        assert_matches!(
            notifier.send_request(1, 2).await,
            Err(FriendshipError::DuplicateRequest)
        );
        // The reverse direction is blocked too.
        assert_matches!(
            notifier.send_request(2, 1).await,
            Err(FriendshipError::DuplicateRequest)
        );
    }

    #[tokio::test]
    async fn test_request_notifies_online_recipient() {
        let (_store, registry, notifier) = seeded();
        let mut bob_rx = attach(&registry, 2);

        notifier.send_request(1, 2).await.unwrap();

        let event = bob_rx.recv().await.unwrap();
        assert_eq!(
            event,
            ServerMessage::FriendRequestReceived {
                from: UserRef {
                    id: 1,
                    username: "alice".to_string(),
                },
            }
        );
    }

    #[tokio::test]
    async fn test_request_confirms_to_online_sender() {
        let (_store, registry, notifier) = seeded();
        let mut alice_rx = attach(&registry, 1);

        notifier.send_request(1, 2).await.unwrap();

        let event = alice_rx.recv().await.unwrap();
        assert_matches!(
            event,
            ServerMessage::FriendRequestSent {
                friend_id: 2,
                status: RelationStatus::Pending,
                ..
            }
        );
    }

    #[tokio::test]
    async fn test_offline_recipient_gets_nothing_but_relation_persists() {
        let (store, _registry, notifier) = seeded();

        notifier.send_request(1, 2).await.unwrap();

        let relation = store.pending_relation(1, 2).await.unwrap().unwrap();
        assert_eq!(relation.status, RelationStatus::Pending);
    }

    #[tokio::test]
    async fn test_respond_without_pending_relation_fails() {
        let (store, _registry, notifier) = seeded();
        assert_matches!(
            notifier.respond(1, 2, true).await,
            Err(FriendshipError::NotFound)
        );
        assert_eq!(store.relation_count(), 0);
    }

    #[tokio::test]
    async fn test_respond_is_direction_scoped() {
        let (_store, _registry, notifier) = seeded();
        notifier.send_request(1, 2).await.unwrap();

        // Only (requester=1, recipient=2) matches the pending relation.
        assert_matches!(
            notifier.respond(2, 1, true).await,
            Err(FriendshipError::NotFound)
        );
        notifier.respond(1, 2, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_accept_notifies_requester_iff_online() {
        let (store, registry, notifier) = seeded();
        notifier.send_request(1, 2).await.unwrap();

        // Requester offline: accepting succeeds, nothing queued for later.
        notifier.respond(1, 2, true).await.unwrap();
        let relation = store.accepted_relation(1, 2).await.unwrap().unwrap();
        assert_eq!(relation.status, RelationStatus::Accepted);

        // A second acceptance replays against no pending relation.
        assert_matches!(
            notifier.respond(1, 2, true).await,
            Err(FriendshipError::NotFound)
        );

        // Now run the flow again with the requester online.
        store.delete_relation(relation.id).await.unwrap();
        let mut alice_rx = attach(&registry, 1);
        notifier.send_request(1, 2).await.unwrap();
        // Drain the sent-confirmation.
        let _ = alice_rx.recv().await.unwrap();

        notifier.respond(1, 2, true).await.unwrap();
        let event = alice_rx.recv().await.unwrap();
        assert_matches!(
            event,
            ServerMessage::FriendRequestAccepted(AcceptedPayload::ToRequester { .. })
        );
    }

    #[tokio::test]
    async fn test_accept_echoes_to_accepter_with_distinct_shape() {
        let (_store, registry, notifier) = seeded();
        notifier.send_request(1, 2).await.unwrap();

        let mut bob_rx = attach(&registry, 2);
        notifier.respond(1, 2, true).await.unwrap();

        let event = bob_rx.recv().await.unwrap();
        assert_matches!(
            event,
            ServerMessage::FriendRequestAccepted(AcceptedPayload::ToAccepter {
                friend_id: 1,
                status: RelationStatus::Accepted,
                ..
            })
        );
    }

    #[tokio::test]
    async fn test_reject_deletes_and_notifies_only_recipient() {
        let (store, registry, notifier) = seeded();
        notifier.send_request(1, 2).await.unwrap();

        let mut alice_rx = attach(&registry, 1);
        let mut bob_rx = attach(&registry, 2);
        notifier.respond(1, 2, false).await.unwrap();

        assert_eq!(store.relation_count(), 0);
        assert_eq!(
            bob_rx.recv().await.unwrap(),
            ServerMessage::FriendRequestRejected { friend_id: 1 }
        );
        // The requester is never told.
        assert_matches!(alice_rx.try_recv(), Err(mpsc::error::TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_remove_requires_accepted_relation() {
        let (_store, _registry, notifier) = seeded();
        notifier.send_request(1, 2).await.unwrap();

        // Still pending, so remove finds nothing.
        assert_matches!(
            notifier.remove(1, 2).await,
            Err(FriendshipError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_remove_notifies_both_parties() {
        let (store, registry, notifier) = seeded();
        notifier.send_request(1, 2).await.unwrap();
        notifier.respond(1, 2, true).await.unwrap();

        let mut alice_rx = attach(&registry, 1);
        let mut bob_rx = attach(&registry, 2);
        notifier.remove(1, 2).await.unwrap();

        assert_eq!(store.relation_count(), 0);
        assert_eq!(
            bob_rx.recv().await.unwrap(),
            ServerMessage::FriendRemoved { friend_id: 1 }
        );
        assert_eq!(
            alice_rx.recv().await.unwrap(),
            ServerMessage::FriendRemoved { friend_id: 2 }
        );
    }

    #[tokio::test]
    async fn test_remove_works_in_either_direction() {
        let (_store, _registry, notifier) = seeded();
        notifier.send_request(1, 2).await.unwrap();
        notifier.respond(1, 2, true).await.unwrap();

        // The recipient of the original request can also remove.
        notifier.remove(2, 1).await.unwrap();
    }
}
