//! Client Connection Manager
//!
//! Owns the channel lifecycle: connect, authenticate, heartbeat, and the
//! reconnection state machine. The manager runs as a single task driving
//! one [`Transport`] session at a time.
//!
//! # Reconnection
//!
//! From `Open`, any close other than the distinguished logout code moves
//! the machine to `Reconnecting`. The next attempt is scheduled after
//! `min(cap, base * multiplier^attempt)`; a successful connection resets
//! the attempt counter. Once the configured attempts are exhausted
//! the machine lands in `GaveUp` and emits exactly one terminal notice —
//! recovery from there is manual.
//!
//! # Heartbeat
//!
//! While `Open`, a ping frame is emitted on a fixed period. The pong is
//! never checked against a timeout, so a half-open connection goes
//! undetected until a send fails.
//!
//! # Subscriptions
//!
//! The server holds no subscription memory across connections. On every
//! successful (re)connection the manager re-announces its identity (the
//! `auth` message) and re-binds the registered event subscriptions before
//! reporting `Open`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::client::config::ClientConfig;
use crate::client::state::ChannelState;
use crate::client::transport::{Connector, Transport, TransportFrame};
use crate::shared::protocol::{ClientMessage, ServerMessage, CLOSE_CODE_LOGOUT};

/// Application-facing channel callbacks.
#[async_trait]
pub trait ChannelEvents: Send + Sync {
    /// A pushed event matching a registered subscription.
    async fn on_event(&self, event: ServerMessage);

    /// The channel (re)opened and re-announced itself.
    async fn on_open(&self) {}

    /// A reconnection attempt was scheduled.
    async fn on_reconnecting(&self, attempt: u32, max_attempts: u32, delay: Duration) {
        let _ = (attempt, max_attempts, delay);
    }

    /// The channel closed after a voluntary disconnect.
    async fn on_closed(&self) {}

    /// Automatic recovery stopped. Emitted exactly once; the application
    /// must surface a persistent notice because nothing will retry.
    async fn on_gave_up(&self);
}

enum Command {
    Send(ClientMessage),
    Disconnect,
}

/// Control handle for a running [`ConnectionManager`].
#[derive(Clone)]
pub struct ChannelHandle {
    commands: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ChannelState>,
}

impl ChannelHandle {
    pub fn state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    /// A watch receiver over state transitions, for callers that want to
    /// await a particular state.
    pub fn state_stream(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Send a message over the channel. Returns false once the manager has
    /// stopped. Messages sent while the channel is not open are dropped.
    pub fn send(&self, message: ClientMessage) -> bool {
        self.commands.send(Command::Send(message)).is_ok()
    }

    /// Voluntarily disconnect. The state machine lands in `Closed` and
    /// never reconnects.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }
}

enum SessionEnd {
    Voluntary,
    Lost { reason: String },
}

/// Owns the channel lifecycle on the client.
pub struct ConnectionManager {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    events: Arc<dyn ChannelEvents>,
    subscribe_all: bool,
    subscriptions: HashSet<String>,
    commands: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ChannelState>,
}

impl ConnectionManager {
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        events: Arc<dyn ChannelEvents>,
    ) -> (Self, ChannelHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ChannelState::Idle);

        let manager = Self {
            config,
            connector,
            events,
            subscribe_all: false,
            subscriptions: HashSet::new(),
            commands: command_rx,
            state_tx,
        };
        let handle = ChannelHandle {
            commands: command_tx,
            state_rx,
        };
        (manager, handle)
    }

    /// Register interest in one server event kind (its wire tag).
    pub fn subscribe(&mut self, kind: impl Into<String>) {
        self.subscriptions.insert(kind.into());
    }

    /// Register interest in every server event.
    pub fn subscribe_all(&mut self) {
        self.subscribe_all = true;
    }

    fn set_state(&self, state: ChannelState) {
        let _ = self.state_tx.send(state);
    }

    /// Run the channel until it terminates in `Closed` or `GaveUp`.
    pub async fn run(mut self) {
        let max_attempts = self.config.max_reconnect_attempts;
        let mut attempt: u32 = 0;
        self.set_state(ChannelState::Connecting);

        loop {
            let connect = tokio::time::timeout(
                self.config.connect_timeout(),
                self.connector.connect(&self.config.url),
            )
            .await;

            match connect {
                Ok(Ok(transport)) => {
                    attempt = 0;
                    match self.drive_session(transport).await {
                        SessionEnd::Voluntary => {
                            self.set_state(ChannelState::Closed);
                            self.events.on_closed().await;
                            return;
                        }
                        SessionEnd::Lost { reason } => {
                            tracing::warn!("[Client] Connection lost: {}", reason);
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!("[Client] Connect failed: {}", e);
                }
                Err(_) => {
                    tracing::warn!("[Client] Connect timed out");
                }
            }

            if !self.config.should_reconnect(attempt) {
                tracing::error!(
                    "[Client] Giving up after {} reconnection attempts",
                    max_attempts
                );
                self.set_state(ChannelState::GaveUp);
                self.events.on_gave_up().await;
                return;
            }

            let delay = self.config.reconnect_delay_for(attempt);
            attempt += 1;
            self.set_state(ChannelState::Reconnecting);
            tracing::info!(
                "[Client] Reconnecting, attempt {}/{} in {:?}",
                attempt,
                max_attempts,
                delay
            );
            self.events
                .on_reconnecting(attempt, max_attempts, delay)
                .await;

            if self.backoff(delay).await {
                self.set_state(ChannelState::Closed);
                self.events.on_closed().await;
                return;
            }
            self.set_state(ChannelState::Connecting);
        }
    }

    /// Wait out a backoff delay. Returns true if a voluntary disconnect
    /// arrived while waiting.
    async fn backoff(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                command = self.commands.recv() => match command {
                    Some(Command::Disconnect) | None => return true,
                    Some(Command::Send(_)) => {
                        // Nothing is queued while disconnected.
                        tracing::debug!("[Client] Dropping send while reconnecting");
                    }
                }
            }
        }
    }

    async fn drive_session(&mut self, mut transport: Transport) -> SessionEnd {
        // Re-announce before the session counts as open: identity first,
        // then the subscription table for this connection.
        let auth = ClientMessage::Auth {
            token: self.config.credential.clone(),
        };
        if !send_message(&mut transport, &auth).await {
            return SessionEnd::Lost {
                reason: "authentication send failed".to_string(),
            };
        }

        let dispatch = SubscriptionFilter {
            all: self.subscribe_all,
            kinds: self.subscriptions.clone(),
        };
        tracing::debug!("[Client] Re-announced {}", dispatch.describe());

        self.set_state(ChannelState::Open);
        self.events.on_open().await;

        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval());
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Send(message)) => {
                        if !send_message(&mut transport, &message).await {
                            return SessionEnd::Lost { reason: "send failed".to_string() };
                        }
                    }
                    Some(Command::Disconnect) | None => {
                        self.set_state(ChannelState::Closing);
                        let _ = transport.outgoing.send(TransportFrame::Close {
                            code: CLOSE_CODE_LOGOUT,
                            reason: "logout".to_string(),
                        }).await;
                        return SessionEnd::Voluntary;
                    }
                },
                frame = transport.incoming.recv() => match frame {
                    None => return SessionEnd::Lost { reason: "transport closed".to_string() },
                    Some(TransportFrame::Text(text)) => self.dispatch(&dispatch, &text).await,
                    Some(TransportFrame::Ping) => {
                        let _ = transport.outgoing.send(TransportFrame::Pong).await;
                    }
                    Some(TransportFrame::Pong) => {
                        // The acknowledgement is not checked against any
                        // timeout; a half-open connection goes undetected.
                    }
                    Some(TransportFrame::Close { code, reason }) => {
                        return SessionEnd::Lost {
                            reason: format!("closed by server ({}): {}", code, reason),
                        };
                    }
                },
                _ = heartbeat.tick() => {
                    // Liveness signal on a fixed period while open.
                    if transport.outgoing.send(TransportFrame::Ping).await.is_err() {
                        return SessionEnd::Lost { reason: "heartbeat send failed".to_string() };
                    }
                }
            }
        }
    }

    async fn dispatch(&self, filter: &SubscriptionFilter, text: &str) {
        let event: ServerMessage = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("[Client] Dropping unparseable event: {}", e);
                return;
            }
        };

        if filter.matches(event.kind()) {
            self.events.on_event(event).await;
        } else {
            tracing::trace!("[Client] No subscription for {}", event.kind());
        }
    }
}

struct SubscriptionFilter {
    all: bool,
    kinds: HashSet<String>,
}

impl SubscriptionFilter {
    fn matches(&self, kind: &str) -> bool {
        self.all || self.kinds.contains(kind)
    }

    fn describe(&self) -> String {
        if self.all {
            "subscription to all events".to_string()
        } else {
            format!("{} event subscriptions", self.kinds.len())
        }
    }
}

async fn send_message(transport: &mut Transport, message: &ClientMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("[Client] Failed to serialize message: {}", e);
            return false;
        }
    };
    transport.outgoing.send(TransportFrame::Text(json)).await.is_ok()
}
