//! In-memory implementation of the durable store.
//!
//! Used when `DATABASE_URL` is not configured (the server starts with an
//! empty store and degraded persistence) and as the fixture store in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::backend::error::StoreError;
use crate::shared::protocol::{PresenceStatus, RelationStatus};

use super::{FriendshipRelation, SocialStore, UserProfile};

#[derive(Default)]
struct MemoryInner {
    users: HashMap<i64, UserProfile>,
    relations: Vec<FriendshipRelation>,
    next_relation_id: i64,
}

/// Durable store held entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user profile.
    pub fn insert_user(&self, profile: UserProfile) {
        let mut inner = self.inner.lock().unwrap();
        inner.users.insert(profile.id, profile);
    }

    /// Number of stored relations. Handy for assertions.
    pub fn relation_count(&self) -> usize {
        self.inner.lock().unwrap().relations.len()
    }
}

#[async_trait::async_trait]
impl SocialStore for MemoryStore {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn set_user_status(
        &self,
        user_id: i64,
        status: PresenceStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.status = status;
        }
        Ok(())
    }

    async fn relation_between(
        &self,
        a: i64,
        b: i64,
    ) -> Result<Option<FriendshipRelation>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .relations
            .iter()
            .find(|r| r.involves(a, b))
            .cloned())
    }

    async fn pending_relation(
        &self,
        requester_id: i64,
        recipient_id: i64,
    ) -> Result<Option<FriendshipRelation>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .relations
            .iter()
            .find(|r| {
                r.requester_id == requester_id
                    && r.recipient_id == recipient_id
                    && r.status == RelationStatus::Pending
            })
            .cloned())
    }

    async fn accepted_relation(
        &self,
        a: i64,
        b: i64,
    ) -> Result<Option<FriendshipRelation>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .relations
            .iter()
            .find(|r| r.involves(a, b) && r.status == RelationStatus::Accepted)
            .cloned())
    }

    async fn create_relation(
        &self,
        requester_id: i64,
        recipient_id: i64,
    ) -> Result<FriendshipRelation, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_relation_id += 1;
        let relation = FriendshipRelation {
            id: inner.next_relation_id,
            requester_id,
            recipient_id,
            status: RelationStatus::Pending,
            created_at: Utc::now(),
        };
        inner.relations.push(relation.clone());
        Ok(relation)
    }

    async fn mark_accepted(&self, relation_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(relation) = inner.relations.iter_mut().find(|r| r.id == relation_id) {
            relation.status = RelationStatus::Accepted;
        }
        Ok(())
    }

    async fn delete_relation(&self, relation_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.relations.retain(|r| r.id != relation_id);
        Ok(())
    }

    async fn accepted_friend_ids(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .relations
            .iter()
            .filter(|r| {
                r.status == RelationStatus::Accepted
                    && (r.requester_id == user_id || r.recipient_id == user_id)
            })
            .map(|r| {
                if r.requester_id == user_id {
                    r.recipient_id
                } else {
                    r.requester_id
                }
            })
            .collect())
    }
}
