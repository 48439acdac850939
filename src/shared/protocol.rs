//! Wire protocol for the realtime channel.
//!
//! Both directions are modeled as closed tagged unions so handlers get
//! exhaustiveness checking instead of string-keyed dictionaries. Every
//! frame is a JSON object `{"type": ..., "payload": ...}` with kebab-case
//! type tags.
//!
//! # Delivery
//!
//! Server pushes are ephemeral: delivered at most once, to at most one
//! live connection, and dropped silently when the recipient is offline.
//! Clients recover missed state through the platform's pull-based
//! endpoints, not through this channel.

use serde::{Deserialize, Serialize};

/// Close code sent by a client that disconnects on purpose (logout).
///
/// Any other close reason is treated as abnormal and triggers the client's
/// reconnection state machine.
pub const CLOSE_CODE_LOGOUT: u16 = 4000;

/// Whether a user currently has a live, authenticated connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a friendship relation in the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationStatus {
    Pending,
    Accepted,
    Rejected,
    Blocked,
}

impl RelationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Blocked => "blocked",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

/// Minimal user reference carried in notification payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
}

/// Full friend profile, pushed to a requester when their request is
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendProfile {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub status: PresenceStatus,
}

/// The `friend-request-accepted` event carries a different shape per
/// recipient role; both share the wire tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AcceptedPayload {
    /// Sent to the original requester.
    ToRequester { friend: FriendProfile },
    /// Echoed to the user who accepted.
    ToAccepter {
        id: i64,
        friend_id: i64,
        status: RelationStatus,
    },
}

/// Messages pushed from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Ids of every user currently online. Sent once, immediately after a
    /// connection authenticates.
    OnlineUsers(Vec<i64>),
    FriendRequestReceived { from: UserRef },
    /// Confirmation to the sender of a friend request.
    FriendRequestSent {
        id: i64,
        friend_id: i64,
        friend_username: String,
        status: RelationStatus,
    },
    FriendRequestAccepted(AcceptedPayload),
    FriendRequestRejected { friend_id: i64 },
    FriendRemoved { friend_id: i64 },
    FriendStatusChange {
        friend_id: i64,
        status: PresenceStatus,
    },
    Error { message: String },
}

impl ServerMessage {
    /// The wire tag of this event, as clients subscribe to it.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OnlineUsers(_) => "online-users",
            Self::FriendRequestReceived { .. } => "friend-request-received",
            Self::FriendRequestSent { .. } => "friend-request-sent",
            Self::FriendRequestAccepted(_) => "friend-request-accepted",
            Self::FriendRequestRejected { .. } => "friend-request-rejected",
            Self::FriendRemoved { .. } => "friend-removed",
            Self::FriendStatusChange { .. } => "friend-status-change",
            Self::Error { .. } => "error",
        }
    }
}

/// Messages a client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// In-band authentication, for clients that cannot attach the
    /// credential to the transport handshake.
    Auth { token: String },
    #[serde(rename_all = "camelCase")]
    FriendRequest { friend_id: i64 },
    #[serde(rename_all = "camelCase")]
    FriendRequestResponse { friend_id: i64, accept: bool },
    #[serde(rename_all = "camelCase")]
    FriendRemove { friend_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_server_message_tags() {
        let msg = ServerMessage::OnlineUsers(vec![1, 2, 3]);
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "online-users");
        assert_eq!(json["payload"], serde_json::json!([1, 2, 3]));

        let msg = ServerMessage::FriendStatusChange {
            friend_id: 7,
            status: PresenceStatus::Online,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "friend-status-change");
        assert_eq!(json["payload"]["friend_id"], 7);
        assert_eq!(json["payload"]["status"], "online");
    }

    #[test]
    fn test_accepted_payload_has_two_shapes() {
        let to_requester = ServerMessage::FriendRequestAccepted(AcceptedPayload::ToRequester {
            friend: FriendProfile {
                id: 2,
                username: "b".to_string(),
                avatar_url: None,
                status: PresenceStatus::Online,
            },
        });
        let json: serde_json::Value = serde_json::to_value(&to_requester).unwrap();
        assert_eq!(json["type"], "friend-request-accepted");
        assert_eq!(json["payload"]["friend"]["username"], "b");

        let to_accepter = ServerMessage::FriendRequestAccepted(AcceptedPayload::ToAccepter {
            id: 11,
            friend_id: 1,
            status: RelationStatus::Accepted,
        });
        let json: serde_json::Value = serde_json::to_value(&to_accepter).unwrap();
        assert_eq!(json["type"], "friend-request-accepted");
        assert_eq!(json["payload"]["friend_id"], 1);
        assert_eq!(json["payload"]["status"], "accepted");
    }

    #[test]
    fn test_accepted_payload_round_trip() {
        let original = ServerMessage::FriendRequestAccepted(AcceptedPayload::ToRequester {
            friend: FriendProfile {
                id: 5,
                username: "carol".to_string(),
                avatar_url: Some("https://cdn.example/carol.png".to_string()),
                status: PresenceStatus::Offline,
            },
        });
        let json = serde_json::to_string(&original).unwrap();
        let decoded: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_client_message_field_casing() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"friend-request","payload":{"friendId":42}}"#).unwrap();
        assert_eq!(msg, ClientMessage::FriendRequest { friend_id: 42 });

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"friend-request-response","payload":{"friendId":42,"accept":true}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::FriendRequestResponse {
                friend_id: 42,
                accept: true
            }
        );
    }

    #[test]
    fn test_auth_message() {
        let msg = ClientMessage::Auth {
            token: "abc".to_string(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "auth");
        assert_eq!(json["payload"]["token"], "abc");
    }

    #[test]
    fn test_relation_status_strings() {
        assert_eq!(RelationStatus::Pending.as_str(), "pending");
        assert_eq!(
            RelationStatus::from_str("accepted"),
            Some(RelationStatus::Accepted)
        );
        assert_eq!(RelationStatus::from_str("bogus"), None);
    }
}
