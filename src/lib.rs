//! Arcadia - Main Library
//!
//! Arcadia is the realtime core of a social game platform: the presence and
//! social-notification subsystem carried over a persistent WebSocket
//! channel.
//!
//! # Overview
//!
//! This library provides:
//! - Authentication of a connection to a user identity (bearer tokens)
//! - A shared online/offline registry across concurrent connections
//! - The friend-request protocol with best-effort push notifications
//! - A reconnecting, heartbeating client connection manager
//!
//! # Module Structure
//!
//! The library is organized into three main modules:
//!
//! - **`shared`** - The wire protocol spoken over the channel, used by both
//!   sides
//! - **`backend`** - Server-side code: the Axum WebSocket endpoint, the
//!   connection registry, presence coordination, friendship notifications,
//!   and the durable-store seam
//! - **`client`** - Client-side code: the connection manager with its
//!   reconnection state machine, heartbeat, and event subscriptions
//!
//! # Delivery Model
//!
//! Notifications are best-effort: an event is pushed only to a recipient
//! with a live, authenticated connection at the moment it is produced.
//! There is no queue and no redelivery; clients reconcile missed state
//! through the platform's pull-based endpoints, which live outside this
//! subsystem.

pub mod backend;
pub mod client;
pub mod shared;
