use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Comment, CommentWithAuthor};
use crate::auth::repo_types::User;
use crate::store::{PgStore, StoreError};

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Comment, StoreError>;
    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError>;
    /// Oldest first, plus the total number of comments on the post.
    async fn list_comments(
        &self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<CommentWithAuthor>, i64), StoreError>;
    async fn update_comment(&self, id: Uuid, content: &str)
        -> Result<Option<Comment>, StoreError>;
    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(FromRow)]
struct CommentAuthorRow {
    #[sqlx(flatten)]
    comment: Comment,
    author_username: String,
    author_email: String,
    author_password_hash: String,
    author_bio: String,
    author_profile_pic: String,
    author_created_at: OffsetDateTime,
    author_updated_at: OffsetDateTime,
}

impl From<CommentAuthorRow> for CommentWithAuthor {
    fn from(r: CommentAuthorRow) -> Self {
        let author = User {
            id: r.comment.user_id,
            username: r.author_username,
            email: r.author_email,
            password_hash: r.author_password_hash,
            bio: r.author_bio,
            profile_pic: r.author_profile_pic,
            created_at: r.author_created_at,
            updated_at: r.author_updated_at,
        };
        Self {
            comment: r.comment,
            author,
        }
    }
}

const COMMENT_COLUMNS: &str = "id, post_id, user_id, content, created_at, updated_at";

#[async_trait]
impl CommentRepo for PgStore {
    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Comment, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (id, post_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn list_comments(
        &self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<CommentWithAuthor>, i64), StoreError> {
        let rows = sqlx::query_as::<_, CommentAuthorRow>(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.content, c.created_at, c.updated_at,
                   u.username      AS author_username,
                   u.email         AS author_email,
                   u.password_hash AS author_password_hash,
                   u.bio           AS author_bio,
                   u.profile_pic   AS author_profile_pic,
                   u.created_at    AS author_created_at,
                   u.updated_at    AS author_updated_at
              FROM comments c
              JOIN users u ON u.id = c.user_id
             WHERE c.post_id = $1
             ORDER BY c.created_at ASC, c.id ASC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn update_comment(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<Option<Comment>, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
               SET content = $2, updated_at = $3
             WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(content)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
