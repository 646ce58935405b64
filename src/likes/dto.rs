use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Like;

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Like> for LikeResponse {
    fn from(l: Like) -> Self {
        Self {
            id: l.id,
            user_id: l.user_id,
            post_id: l.post_id,
            created_at: l.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LikesSummary {
    pub post_id: Uuid,
    pub likes_count: i64,
    pub liked_by_me: bool,
}
