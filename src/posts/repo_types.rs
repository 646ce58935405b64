use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown post status {0:?}")]
pub struct UnknownStatus(String);

impl FromStr for PostStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Row shape of `posts`; status is TEXT in the database.
#[derive(Debug, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub status: String,
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub status: PostStatus,
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<PostRow> for Post {
    type Error = UnknownStatus;

    fn try_from(r: PostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            title: r.title,
            content: r.content,
            slug: r.slug,
            status: r.status.parse()?,
            published_at: r.published_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// A category or a tag.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct Taxon {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaxon {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Media {
    pub id: Uuid,
    pub post_id: Uuid,
    pub filename: String,
    pub path: String,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub filename: String,
    pub path: String,
    pub mime_type: String,
}

#[derive(Debug)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub status: PostStatus,
    pub published_at: Option<OffsetDateTime>,
    pub categories: Vec<NewTaxon>,
    pub tags: Vec<NewTaxon>,
    pub media: Option<NewMedia>,
}

/// Partial update; `None` keeps the stored value. Collections given as
/// `Some` replace the existing set.
#[derive(Debug, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub slug: Option<String>,
    pub status: Option<PostStatus>,
    pub published_at: Option<OffsetDateTime>,
    pub categories: Option<Vec<NewTaxon>>,
    pub tags: Option<Vec<NewTaxon>>,
    pub media: Option<NewMedia>,
}

#[derive(Debug, Clone, Copy)]
pub struct PostFilter {
    pub author_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: User,
}

#[derive(Debug, Clone)]
pub struct PostDetails {
    pub post: Post,
    pub author: User,
    pub categories: Vec<Taxon>,
    pub tags: Vec<Taxon>,
    pub media: Option<Media>,
}
