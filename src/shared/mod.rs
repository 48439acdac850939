//! Shared Module
//!
//! Types spoken on both sides of the realtime channel. Everything here is
//! serialization-oriented and free of server- or client-only dependencies.

/// Wire protocol for the realtime channel
pub mod protocol;

pub use protocol::{
    AcceptedPayload, ClientMessage, FriendProfile, PresenceStatus, RelationStatus, ServerMessage,
    UserRef, CLOSE_CODE_LOGOUT,
};
