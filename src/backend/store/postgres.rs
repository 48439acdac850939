//! Postgres implementation of the durable store.
//!
//! Queries follow the runtime-bound style used across the code base:
//! `sqlx::query` with positional binds, rows mapped by column name.

use sqlx::{PgPool, Row};

use crate::backend::error::StoreError;
use crate::shared::protocol::{PresenceStatus, RelationStatus};

use super::{FriendshipRelation, SocialStore, UserProfile};

/// Durable store backed by a Postgres connection pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_relation(row: &sqlx::postgres::PgRow) -> FriendshipRelation {
    FriendshipRelation {
        id: row.get("id"),
        requester_id: row.get("requester_id"),
        recipient_id: row.get("recipient_id"),
        status: RelationStatus::from_str(row.get::<String, _>("status").as_str())
            .unwrap_or(RelationStatus::Pending),
        created_at: row.get("created_at"),
    }
}

#[async_trait::async_trait]
impl SocialStore for PgStore {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, avatar_url, status
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| UserProfile {
            id: r.get("id"),
            username: r.get("username"),
            avatar_url: r.get("avatar_url"),
            status: match r.get::<String, _>("status").as_str() {
                "online" => PresenceStatus::Online,
                _ => PresenceStatus::Offline,
            },
        }))
    }

    async fn set_user_status(
        &self,
        user_id: i64,
        status: PresenceStatus,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET status = $1
            WHERE id = $2
            "#,
        )
        .bind(status.as_str())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn relation_between(
        &self,
        a: i64,
        b: i64,
    ) -> Result<Option<FriendshipRelation>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, requester_id, recipient_id, status, created_at
            FROM friendships
            WHERE (requester_id = $1 AND recipient_id = $2)
               OR (requester_id = $2 AND recipient_id = $1)
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_relation(&r)))
    }

    async fn pending_relation(
        &self,
        requester_id: i64,
        recipient_id: i64,
    ) -> Result<Option<FriendshipRelation>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, requester_id, recipient_id, status, created_at
            FROM friendships
            WHERE requester_id = $1 AND recipient_id = $2 AND status = 'pending'
            "#,
        )
        .bind(requester_id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_relation(&r)))
    }

    async fn accepted_relation(
        &self,
        a: i64,
        b: i64,
    ) -> Result<Option<FriendshipRelation>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, requester_id, recipient_id, status, created_at
            FROM friendships
            WHERE ((requester_id = $1 AND recipient_id = $2)
                OR (requester_id = $2 AND recipient_id = $1))
              AND status = 'accepted'
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_relation(&r)))
    }

    async fn create_relation(
        &self,
        requester_id: i64,
        recipient_id: i64,
    ) -> Result<FriendshipRelation, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO friendships (requester_id, recipient_id, status)
            VALUES ($1, $2, 'pending')
            RETURNING id, requester_id, recipient_id, status, created_at
            "#,
        )
        .bind(requester_id)
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_relation(&row))
    }

    async fn mark_accepted(&self, relation_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE friendships
            SET status = 'accepted'
            WHERE id = $1
            "#,
        )
        .bind(relation_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_relation(&self, relation_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM friendships
            WHERE id = $1
            "#,
        )
        .bind(relation_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn accepted_friend_ids(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT requester_id, recipient_id
            FROM friendships
            WHERE (requester_id = $1 OR recipient_id = $1) AND status = 'accepted'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let requester: i64 = r.get("requester_id");
                if requester == user_id {
                    r.get("recipient_id")
                } else {
                    requester
                }
            })
            .collect())
    }
}
