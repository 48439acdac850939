//! Connection Registry
//!
//! Shared bidirectional map between user identity and live connection
//! handle. All mutation is confined behind one mutex, so operations are
//! serialized relative to one another and events for the same user apply
//! in arrival order. No operation here performs I/O or blocks on the
//! durable store.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::shared::protocol::ServerMessage;

/// A live connection's push endpoint.
///
/// Pushing is best-effort: a closed channel means the socket is already
/// gone and the event is dropped silently.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: Uuid,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ConnectionHandle {
    pub fn new(connection_id: Uuid, tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { connection_id, tx }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Push a message to this connection. Returns whether the connection
    /// was still accepting messages.
    pub fn push(&self, message: ServerMessage) -> bool {
        self.tx.send(message).is_ok()
    }
}

#[derive(Default)]
struct RegistryInner {
    /// user id -> live handle
    online: HashMap<i64, ConnectionHandle>,
    /// connection id -> user id; always consistent with `online`
    owners: HashMap<Uuid, i64>,
}

/// Single source of truth for which users are online.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user's live connection, overwriting any prior entry for
    /// the same user (last-connect-wins).
    ///
    /// A displaced handle is not closed here; its socket stays open until
    /// the transport notices on its own.
    pub fn register(&self, user_id: i64, handle: ConnectionHandle) {
        let mut inner = self.inner.lock().unwrap();
        let connection_id = handle.connection_id;
        if let Some(previous) = inner.online.insert(user_id, handle) {
            if previous.connection_id != connection_id {
                inner.owners.remove(&previous.connection_id);
                tracing::debug!(
                    "[Registry] User {} re-registered, displacing connection {}",
                    user_id,
                    previous.connection_id
                );
            }
        }
        inner.owners.insert(connection_id, user_id);
    }

    /// The live handle for a user, if any.
    pub fn lookup(&self, user_id: i64) -> Option<ConnectionHandle> {
        let inner = self.inner.lock().unwrap();
        inner.online.get(&user_id).cloned()
    }

    /// Unregister a connection.
    ///
    /// Erases the forward and reverse entries only if the reverse index
    /// still points at a user for this connection; a stale or repeated
    /// removal is a no-op. Returns the user whose entry was erased.
    pub fn remove(&self, connection_id: Uuid) -> Option<i64> {
        let mut inner = self.inner.lock().unwrap();
        let user_id = inner.owners.remove(&connection_id)?;
        inner.online.remove(&user_id);
        Some(user_id)
    }

    /// Ids of every user currently online.
    pub fn snapshot(&self) -> Vec<i64> {
        let inner = self.inner.lock().unwrap();
        inner.online.keys().copied().collect()
    }
}
