use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::Like;
use crate::store::{PgStore, StoreError};

#[async_trait]
pub trait LikeRepo: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the user already likes the post.
    async fn create_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Like, StoreError>;
    async fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    async fn count_likes(&self, post_id: Uuid) -> Result<i64, StoreError>;
    async fn has_liked(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
impl LikeRepo for PgStore {
    async fn create_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Like, StoreError> {
        let like = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (id, user_id, post_id)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, post_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(like)
    }

    async fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn has_liked(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM likes WHERE post_id = $1 AND user_id = $2)",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
