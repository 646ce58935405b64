use async_trait::async_trait;
use sqlx::{FromRow, PgConnection};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{
    Media, NewMedia, NewPost, NewTaxon, Post, PostChanges, PostDetails, PostFilter, PostRow,
    PostWithAuthor, Taxon, UnknownStatus,
};
use crate::auth::repo_types::User;
use crate::store::{PgStore, StoreError};

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError>;
    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;
    /// Post with its author, taxonomy and media.
    async fn post_details(&self, id: Uuid) -> Result<Option<PostDetails>, StoreError>;
    /// One page of posts with their authors, plus the total matching count.
    async fn list_posts(&self, filter: PostFilter)
        -> Result<(Vec<PostWithAuthor>, i64), StoreError>;
    /// `None` when the post no longer exists.
    async fn update_post(
        &self,
        id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>, StoreError>;
    /// Returns false when nothing was deleted.
    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError>;
}

impl From<UnknownStatus> for StoreError {
    fn from(e: UnknownStatus) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

const POST_COLUMNS: &str =
    "id, user_id, title, content, slug, status, published_at, created_at, updated_at";

/// `posts` joined with its author, author columns prefixed with `author_`.
#[derive(Debug, FromRow)]
struct PostAuthorRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: String,
    slug: String,
    status: String,
    published_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    author_username: String,
    author_email: String,
    author_password_hash: String,
    author_bio: String,
    author_profile_pic: String,
    author_created_at: OffsetDateTime,
    author_updated_at: OffsetDateTime,
}

impl TryFrom<PostAuthorRow> for PostWithAuthor {
    type Error = UnknownStatus;

    fn try_from(r: PostAuthorRow) -> Result<Self, Self::Error> {
        let author = User {
            id: r.user_id,
            username: r.author_username,
            email: r.author_email,
            password_hash: r.author_password_hash,
            bio: r.author_bio,
            profile_pic: r.author_profile_pic,
            created_at: r.author_created_at,
            updated_at: r.author_updated_at,
        };
        let post = Post::try_from(PostRow {
            id: r.id,
            user_id: r.user_id,
            title: r.title,
            content: r.content,
            slug: r.slug,
            status: r.status,
            published_at: r.published_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })?;
        Ok(PostWithAuthor { post, author })
    }
}

const POST_AUTHOR_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.title, p.content, p.slug, p.status,
           p.published_at, p.created_at, p.updated_at,
           u.username      AS author_username,
           u.email         AS author_email,
           u.password_hash AS author_password_hash,
           u.bio           AS author_bio,
           u.profile_pic   AS author_profile_pic,
           u.created_at    AS author_created_at,
           u.updated_at    AS author_updated_at
      FROM posts p
      JOIN users u ON u.id = p.user_id
"#;

#[derive(Debug, Clone, Copy)]
enum TaxonKind {
    Category,
    Tag,
}

impl TaxonKind {
    fn table(self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Tag => "tags",
        }
    }

    fn join_table(self) -> &'static str {
        match self {
            Self::Category => "post_categories",
            Self::Tag => "post_tags",
        }
    }

    fn fk(self) -> &'static str {
        match self {
            Self::Category => "category_id",
            Self::Tag => "tag_id",
        }
    }
}

/// Links `items` to the post, creating taxa that do not exist yet.
async fn attach_taxa(
    conn: &mut PgConnection,
    kind: TaxonKind,
    post_id: Uuid,
    items: &[NewTaxon],
) -> Result<(), StoreError> {
    for item in items {
        let (taxon_id,): (Uuid,) = sqlx::query_as(&format!(
            r#"
            INSERT INTO {table} (id, name, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
            table = kind.table()
        ))
        .bind(Uuid::new_v4())
        .bind(&item.name)
        .bind(&item.description)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO {join} (post_id, {fk}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            join = kind.join_table(),
            fk = kind.fk()
        ))
        .bind(post_id)
        .bind(taxon_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn detach_taxa(
    conn: &mut PgConnection,
    kind: TaxonKind,
    post_id: Uuid,
) -> Result<(), StoreError> {
    sqlx::query(&format!("DELETE FROM {} WHERE post_id = $1", kind.join_table()))
        .bind(post_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn taxa_for_post(
    conn: &mut PgConnection,
    kind: TaxonKind,
    post_id: Uuid,
) -> Result<Vec<Taxon>, StoreError> {
    let rows = sqlx::query_as::<_, Taxon>(&format!(
        r#"
        SELECT t.id, t.name, t.description
          FROM {table} t
          JOIN {join} j ON j.{fk} = t.id
         WHERE j.post_id = $1
         ORDER BY t.name
        "#,
        table = kind.table(),
        join = kind.join_table(),
        fk = kind.fk()
    ))
    .bind(post_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

async fn replace_media(
    conn: &mut PgConnection,
    post_id: Uuid,
    media: &NewMedia,
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM media WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO media (id, post_id, filename, path, mime_type)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(post_id)
    .bind(&media.filename)
    .bind(&media.path)
    .bind(&media.mime_type)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[async_trait]
impl PostRepo for PgStore {
    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            INSERT INTO posts (id, user_id, title, content, slug, status, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(post.user_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.slug)
        .bind(post.status.as_str())
        .bind(post.published_at)
        .fetch_one(&mut *tx)
        .await?;

        attach_taxa(&mut tx, TaxonKind::Category, row.id, &post.categories).await?;
        attach_taxa(&mut tx, TaxonKind::Tag, row.id, &post.tags).await?;
        if let Some(media) = &post.media {
            replace_media(&mut tx, row.id, media).await?;
        }

        tx.commit().await?;
        Ok(Post::try_from(row)?)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Post::try_from).transpose()?)
    }

    async fn post_details(&self, id: Uuid) -> Result<Option<PostDetails>, StoreError> {
        let mut conn = self.pool.acquire().await?;

        let Some(row) = sqlx::query_as::<_, PostAuthorRow>(&format!(
            "{POST_AUTHOR_SELECT} WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        else {
            return Ok(None);
        };
        let PostWithAuthor { post, author } = row.try_into()?;

        let categories = taxa_for_post(&mut conn, TaxonKind::Category, id).await?;
        let tags = taxa_for_post(&mut conn, TaxonKind::Tag, id).await?;
        let media = sqlx::query_as::<_, Media>(
            "SELECT id, post_id, filename, path, mime_type FROM media WHERE post_id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(Some(PostDetails {
            post,
            author,
            categories,
            tags,
            media,
        }))
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
    ) -> Result<(Vec<PostWithAuthor>, i64), StoreError> {
        let rows = sqlx::query_as::<_, PostAuthorRow>(&format!(
            r#"
            {POST_AUTHOR_SELECT}
             WHERE ($1::uuid IS NULL OR p.user_id = $1)
             ORDER BY p.created_at ASC, p.id ASC
             LIMIT $2 OFFSET $3
            "#
        ))
        .bind(filter.author_id)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM posts WHERE ($1::uuid IS NULL OR user_id = $1)")
                .bind(filter.author_id)
                .fetch_one(&self.pool)
                .await?;

        let items = rows
            .into_iter()
            .map(PostWithAuthor::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total))
    }

    async fn update_post(
        &self,
        id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            UPDATE posts
               SET title        = COALESCE($2, title),
                   content      = COALESCE($3, content),
                   slug         = COALESCE($4, slug),
                   status       = COALESCE($5, status),
                   published_at = COALESCE(published_at, $6),
                   updated_at   = $7
             WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(&changes.slug)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.published_at)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        if let Some(categories) = &changes.categories {
            detach_taxa(&mut tx, TaxonKind::Category, id).await?;
            attach_taxa(&mut tx, TaxonKind::Category, id, categories).await?;
        }
        if let Some(tags) = &changes.tags {
            detach_taxa(&mut tx, TaxonKind::Tag, id).await?;
            attach_taxa(&mut tx, TaxonKind::Tag, id, tags).await?;
        }
        if let Some(media) = &changes.media {
            replace_media(&mut tx, id, media).await?;
        }

        tx.commit().await?;
        Ok(Some(Post::try_from(row)?))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
