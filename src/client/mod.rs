//! Client Module
//!
//! The client side of the realtime channel: configuration, the connection
//! state machine, and the WebSocket transport. The connection manager owns
//! the lifecycle — connect, authenticate, heartbeat, reconnect with
//! exponential backoff — and dispatches pushed events to registered
//! subscriptions.

pub mod config;
pub mod manager;
pub mod state;
pub mod transport;

pub use config::ClientConfig;
pub use manager::{ChannelEvents, ChannelHandle, ConnectionManager};
pub use state::ChannelState;
pub use transport::{Connector, Transport, TransportError, TransportFrame, WsConnector};
