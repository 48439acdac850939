//! Durable store seam.
//!
//! The durable store owns user status fields and friendship relations; this
//! subsystem only reads and writes them through the [`SocialStore`] trait.
//! The trait exists so the registry, coordinator, and notifier can be
//! constructed with an injected store and unit-tested without a live
//! database.
//!
//! Two implementations ship: [`PgStore`] over Postgres, and [`MemoryStore`]
//! used when no database is configured and as the test fixture.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::backend::error::StoreError;
use crate::shared::protocol::{PresenceStatus, RelationStatus};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A friendship relation as the durable store records it.
///
/// Spans from request creation to acceptance (terminal `accepted`, mutable
/// only by removal thereafter) or to rejection/removal, which hard-delete
/// the row.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendshipRelation {
    pub id: i64,
    pub requester_id: i64,
    pub recipient_id: i64,
    pub status: RelationStatus,
    pub created_at: DateTime<Utc>,
}

impl FriendshipRelation {
    /// Whether the relation involves the given unordered pair.
    pub fn involves(&self, a: i64, b: i64) -> bool {
        (self.requester_id == a && self.recipient_id == b)
            || (self.requester_id == b && self.recipient_id == a)
    }
}

/// User profile fields this subsystem reads to build notification payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub status: PresenceStatus,
}

/// The durable-store surface consumed by the realtime subsystem.
#[async_trait]
pub trait SocialStore: Send + Sync {
    /// Look up a user profile by id.
    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError>;

    /// Write a user's durable online/offline status.
    async fn set_user_status(
        &self,
        user_id: i64,
        status: PresenceStatus,
    ) -> Result<(), StoreError>;

    /// Any relation between the unordered pair, any status.
    async fn relation_between(
        &self,
        a: i64,
        b: i64,
    ) -> Result<Option<FriendshipRelation>, StoreError>;

    /// The pending relation scoped exactly to `(requester, recipient)`.
    async fn pending_relation(
        &self,
        requester_id: i64,
        recipient_id: i64,
    ) -> Result<Option<FriendshipRelation>, StoreError>;

    /// The accepted relation between the unordered pair.
    async fn accepted_relation(
        &self,
        a: i64,
        b: i64,
    ) -> Result<Option<FriendshipRelation>, StoreError>;

    /// Create a new pending relation.
    async fn create_relation(
        &self,
        requester_id: i64,
        recipient_id: i64,
    ) -> Result<FriendshipRelation, StoreError>;

    /// Flip a relation to accepted.
    async fn mark_accepted(&self, relation_id: i64) -> Result<(), StoreError>;

    /// Hard-delete a relation. No history is retained.
    async fn delete_relation(&self, relation_id: i64) -> Result<(), StoreError>;

    /// Ids of every user with an accepted relation involving `user_id`.
    async fn accepted_friend_ids(&self, user_id: i64) -> Result<Vec<i64>, StoreError>;
}
