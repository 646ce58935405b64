use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Media, PostDetails, PostStatus, PostWithAuthor, Taxon};
use crate::auth::PublicAuthor;
use crate::comments::dto::CommentResponse;

#[derive(Debug, Deserialize)]
pub struct TaxonInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaInput {
    pub filename: String,
    pub path: String,
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub categories: Vec<TaxonInput>,
    #[serde(default)]
    pub tags: Vec<TaxonInput>,
    pub media: Option<MediaInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub slug: Option<String>,
    pub status: Option<PostStatus>,
    pub categories: Option<Vec<TaxonInput>>,
    pub tags: Option<Vec<TaxonInput>>,
    pub media: Option<MediaInput>,
}

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub page: Option<i64>,
    #[serde(alias = "pageSize")]
    pub page_size: Option<i64>,
    pub author_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TaxonResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<Taxon> for TaxonResponse {
    fn from(t: Taxon) -> Self {
        Self {
            id: t.id,
            name: t.name,
            description: t.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub id: Uuid,
    pub filename: String,
    pub path: String,
    pub mime_type: String,
}

impl From<Media> for MediaResponse {
    fn from(m: Media) -> Self {
        Self {
            id: m.id,
            filename: m.filename,
            path: m.path,
            mime_type: m.mime_type,
        }
    }
}

/// Entry in the post list.
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub status: PostStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: PublicAuthor,
}

impl From<PostWithAuthor> for PostSummary {
    fn from(p: PostWithAuthor) -> Self {
        Self {
            id: p.post.id,
            title: p.post.title,
            slug: p.post.slug,
            status: p.post.status,
            published_at: p.post.published_at,
            created_at: p.post.created_at,
            author: p.author.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub status: PostStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub author: PublicAuthor,
    pub categories: Vec<TaxonResponse>,
    pub tags: Vec<TaxonResponse>,
    pub media: Option<MediaResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments_count: Option<i64>,
}

impl From<PostDetails> for PostResponse {
    fn from(d: PostDetails) -> Self {
        Self {
            id: d.post.id,
            title: d.post.title,
            content: d.post.content,
            slug: d.post.slug,
            status: d.post.status,
            published_at: d.post.published_at,
            created_at: d.post.created_at,
            updated_at: d.post.updated_at,
            author: d.author.into(),
            categories: d.categories.into_iter().map(Into::into).collect(),
            tags: d.tags.into_iter().map(Into::into).collect(),
            media: d.media.map(Into::into),
            likes_count: None,
            comments: None,
            comments_count: None,
        }
    }
}
