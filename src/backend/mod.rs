//! Backend Module
//!
//! Server-side code of the realtime subsystem: the WebSocket endpoint,
//! session authentication, the connection registry, presence coordination,
//! friendship notifications, and the durable-store seam.

pub mod auth;
pub mod error;
pub mod friends;
pub mod presence;
pub mod server;
pub mod store;
pub mod ws;
