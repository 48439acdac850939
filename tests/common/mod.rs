//! Common test fixtures for the realtime subsystem.

use std::sync::Arc;

use arcadia::backend::friends::FriendshipNotifier;
use arcadia::backend::presence::{ConnectionHandle, ConnectionRegistry, PresenceCoordinator};
use arcadia::backend::store::{MemoryStore, UserProfile};
use arcadia::shared::protocol::{PresenceStatus, ServerMessage};
use tokio::sync::mpsc;
use uuid::Uuid;

/// The realtime service graph over an in-memory store.
pub struct Realtime {
    pub store: Arc<MemoryStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub coordinator: PresenceCoordinator,
    pub notifier: FriendshipNotifier,
}

/// Build the services with the given users seeded into the store.
pub fn realtime_with_users(users: &[(i64, &str)]) -> Realtime {
    let store = Arc::new(MemoryStore::new());
    for (id, username) in users {
        store.insert_user(UserProfile {
            id: *id,
            username: username.to_string(),
            avatar_url: None,
            status: PresenceStatus::Offline,
        });
    }
    let registry = Arc::new(ConnectionRegistry::new());
    Realtime {
        coordinator: PresenceCoordinator::new(store.clone(), registry.clone()),
        notifier: FriendshipNotifier::new(store.clone(), registry.clone()),
        store,
        registry,
    }
}

/// Register a live connection for a user; returns its inbox and the
/// connection id.
pub fn connect_user(
    registry: &ConnectionRegistry,
    user_id: i64,
) -> (mpsc::UnboundedReceiver<ServerMessage>, Uuid) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = Uuid::new_v4();
    registry.register(user_id, ConnectionHandle::new(connection_id, tx));
    (rx, connection_id)
}
