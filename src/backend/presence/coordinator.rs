//! Presence Coordinator
//!
//! Turns registry transitions into durable status writes and best-effort
//! `friend-status-change` fan-out. The durable write is fire-and-forget
//! relative to the in-memory transition: a slow or unavailable store must
//! never stall live notification delivery, so in-memory presence and
//! durable status may transiently diverge.

use std::sync::Arc;

use crate::backend::presence::ConnectionRegistry;
use crate::backend::store::SocialStore;
use crate::shared::protocol::{PresenceStatus, ServerMessage};

pub struct PresenceCoordinator {
    store: Arc<dyn SocialStore>,
    registry: Arc<ConnectionRegistry>,
}

impl PresenceCoordinator {
    pub fn new(store: Arc<dyn SocialStore>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { store, registry }
    }

    /// Called after a connection authenticated and was registered.
    pub async fn on_authenticated(&self, user_id: i64) {
        self.transition(user_id, PresenceStatus::Online).await;
    }

    /// Called after a connection's registry entry was removed.
    pub async fn on_disconnected(&self, user_id: i64) {
        self.transition(user_id, PresenceStatus::Offline).await;
    }

    async fn transition(&self, user_id: i64, status: PresenceStatus) {
        // Durable write, never awaited by the caller. A failure is logged
        // and not retried; disconnect is the only cancellation signal.
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.set_user_status(user_id, status).await {
                tracing::warn!(
                    "[Presence] Failed to persist status {} for user {}: {}",
                    status,
                    user_id,
                    e
                );
            }
        });

        let friends = match self.store.accepted_friend_ids(user_id).await {
            Ok(friends) => friends,
            Err(e) => {
                tracing::warn!(
                    "[Presence] Failed to load friends of user {}: {}",
                    user_id,
                    e
                );
                return;
            }
        };

        let mut delivered = 0usize;
        for friend_id in friends {
            if let Some(handle) = self.registry.lookup(friend_id) {
                if handle.push(ServerMessage::FriendStatusChange {
                    friend_id: user_id,
                    status,
                }) {
                    delivered += 1;
                }
            }
        }

        tracing::debug!(
            "[Presence] User {} is now {}, notified {} online friends",
            user_id,
            status,
            delivered
        );
    }
}
