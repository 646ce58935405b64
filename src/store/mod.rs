use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use crate::{
    auth::repo::UserRepo, comments::repo::CommentRepo, likes::repo::LikeRepo,
    posts::repo::PostRepo,
};

#[cfg(test)]
pub mod memory;

/// Everything the handlers need from persistence.
pub trait Store: UserRepo + PostRepo + CommentRepo + LikeRepo {}

impl<T> Store for T where T: UserRepo + PostRepo + CommentRepo + LikeRepo {}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write; carries what was duplicated.
    #[error("duplicate {0}")]
    Conflict(&'static str),
    /// A foreign key pointed at a row that no longer exists; carries its kind.
    #[error("missing {0}")]
    MissingReference(&'static str),
    #[error("invalid stored data: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return Self::Conflict(conflict_subject(db.constraint()));
            }
            if db.is_foreign_key_violation() {
                return Self::MissingReference(reference_subject(db.constraint()));
            }
        }
        Self::Database(e)
    }
}

fn conflict_subject(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "email",
        Some("users_username_key") => "username",
        Some("posts_slug_key") => "slug",
        Some("likes_user_post_key") => "like",
        Some("categories_name_key") => "category",
        Some("tags_name_key") => "tag",
        _ => "record",
    }
}

fn reference_subject(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.ends_with("_post_id_fkey") => "post",
        Some(c) if c.ends_with("_user_id_fkey") => "user",
        _ => "record",
    }
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")
    }
}
