//! WebSocket endpoint and per-connection loop.
//!
//! The credential may arrive out-of-band as a `token` query parameter on
//! the upgrade request, or in-band as an `auth` message once the socket is
//! open. A bad handshake token refuses the upgrade outright; a bad in-band
//! token only emits an `error` push and leaves the socket open.
//!
//! A user becomes visible to registry lookups only after authentication
//! completes, and the `online-users` snapshot plus presence fan-out happen
//! only after registration succeeds.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::auth::UserIdentity;
use crate::backend::server::state::AppState;
use crate::shared::protocol::{ClientMessage, ServerMessage};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Handle the WebSocket upgrade (GET /ws).
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    // Handshake-time credential: verified before upgrading, so a bad token
    // refuses the connection.
    let identity = match query.token {
        Some(token) => match state.authenticator.verify(&token).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!("[Ws] Handshake authentication failed: {}", e);
                return StatusCode::UNAUTHORIZED.into_response();
            }
        },
        None => None,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Drive one WebSocket connection until it closes.
async fn handle_socket(socket: WebSocket, state: AppState, identity: Option<UserIdentity>) {
    let connection_id = Uuid::new_v4();
    tracing::debug!("[Ws] Connection {} opened", connection_id);

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Outbound pump: everything pushed at this connection goes through one
    // task, so registry pushes never block on the socket.
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("[Ws] Failed to serialize push: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut session = ConnectionSession {
        connection_id,
        tx,
        state,
        user: None,
    };

    if let Some(identity) = identity {
        session.bind_identity(identity).await;
    }

    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("[Ws] Connection {} transport error: {}", connection_id, e);
                break;
            }
        };

        match message {
            Message::Text(text) => session.handle_text(text.as_str()).await,
            Message::Close(_) => break,
            // Ping/Pong are answered by the protocol layer; the server
            // never tracks them.
            _ => {}
        }
    }

    session.teardown().await;
    send_task.abort();
    tracing::debug!("[Ws] Connection {} closed", connection_id);
}

/// Per-connection state: which user (if any) this socket authenticated as.
struct ConnectionSession {
    connection_id: Uuid,
    tx: mpsc::UnboundedSender<ServerMessage>,
    state: AppState,
    user: Option<UserIdentity>,
}

impl ConnectionSession {
    fn push(&self, message: ServerMessage) {
        let _ = self.tx.send(message);
    }

    fn push_error(&self, message: impl Into<String>) {
        self.push(ServerMessage::Error {
            message: message.into(),
        });
    }

    /// Bind a verified identity onto this connection: register it, seed
    /// the online set, and fan presence out to friends.
    async fn bind_identity(&mut self, identity: UserIdentity) {
        if let Some(existing) = &self.user {
            // Re-authenticating as the same user is idempotent; switching
            // identities on a live connection is not supported.
            if existing.id == identity.id {
                return;
            }
            self.push_error("connection is already authenticated");
            return;
        }

        let user_id = identity.id;
        self.user = Some(identity);

        let handle =
            crate::backend::presence::ConnectionHandle::new(self.connection_id, self.tx.clone());
        self.state.registry.register(user_id, handle);
        tracing::info!(
            "[Ws] Connection {} authenticated as user {}",
            self.connection_id,
            user_id
        );

        // Snapshot and fan-out strictly after registration.
        self.push(ServerMessage::OnlineUsers(self.state.registry.snapshot()));
        self.state.coordinator.on_authenticated(user_id).await;
    }

    async fn handle_text(&mut self, text: &str) {
        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(
                    "[Ws] Connection {} sent malformed message: {}",
                    self.connection_id,
                    e
                );
                self.push_error("malformed message");
                return;
            }
        };

        match message {
            ClientMessage::Auth { token } => match self.state.authenticator.verify(&token).await {
                Ok(identity) => self.bind_identity(identity).await,
                Err(e) => {
                    // In-band failure leaves the socket open.
                    tracing::warn!(
                        "[Ws] Connection {} in-band authentication failed: {}",
                        self.connection_id,
                        e
                    );
                    self.push_error(e.to_string());
                }
            },
            ClientMessage::FriendRequest { friend_id } => {
                let Some(user_id) = self.authenticated_user() else {
                    return;
                };
                if let Err(e) = self.state.notifier.send_request(user_id, friend_id).await {
                    self.push_error(e.to_string());
                }
            }
            ClientMessage::FriendRequestResponse { friend_id, accept } => {
                let Some(user_id) = self.authenticated_user() else {
                    return;
                };
                // `friend_id` is the original requester; this connection's
                // user is the recipient resolving the request.
                if let Err(e) = self.state.notifier.respond(friend_id, user_id, accept).await {
                    self.push_error(e.to_string());
                }
            }
            ClientMessage::FriendRemove { friend_id } => {
                let Some(user_id) = self.authenticated_user() else {
                    return;
                };
                if let Err(e) = self.state.notifier.remove(user_id, friend_id).await {
                    self.push_error(e.to_string());
                }
            }
        }
    }

    fn authenticated_user(&self) -> Option<i64> {
        match &self.user {
            Some(user) => Some(user.id),
            None => {
                self.push_error("not authenticated");
                None
            }
        }
    }

    /// Unregister this connection and fan out the offline transition, but
    /// only if the registry entry still belongs to this socket.
    async fn teardown(&mut self) {
        if let Some(user_id) = self.state.registry.remove(self.connection_id) {
            self.state.coordinator.on_disconnected(user_id).await;
        }
    }
}
