//! In-process store backing `AppState::fake()`.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::StoreError;
use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, ProfileChanges, User},
    },
    comments::{
        repo::CommentRepo,
        repo_types::{Comment, CommentWithAuthor},
    },
    likes::{repo::LikeRepo, repo_types::Like},
    posts::{
        repo::PostRepo,
        repo_types::{
            Media, NewMedia, NewPost, NewTaxon, Post, PostChanges, PostDetails, PostFilter,
            PostWithAuthor, Taxon,
        },
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    categories: Vec<Taxon>,
    tags: Vec<Taxon>,
    post_categories: Vec<(Uuid, Uuid)>,
    post_tags: Vec<(Uuid, Uuid)>,
    media: Vec<Media>,
    comments: Vec<Comment>,
    likes: Vec<Like>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn window<T: Clone>(items: &[T], limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.iter().skip(offset).take(limit).cloned().collect()
}

fn attach(
    pool: &mut Vec<Taxon>,
    links: &mut Vec<(Uuid, Uuid)>,
    post_id: Uuid,
    items: &[NewTaxon],
) {
    for item in items {
        let taxon_id = match pool.iter().find(|t| t.name == item.name) {
            Some(t) => t.id,
            None => {
                let taxon = Taxon {
                    id: Uuid::new_v4(),
                    name: item.name.clone(),
                    description: item.description.clone(),
                };
                let id = taxon.id;
                pool.push(taxon);
                id
            }
        };
        if !links.contains(&(post_id, taxon_id)) {
            links.push((post_id, taxon_id));
        }
    }
}

fn taxa_for(pool: &[Taxon], links: &[(Uuid, Uuid)], post_id: Uuid) -> Vec<Taxon> {
    let mut taxa: Vec<Taxon> = links
        .iter()
        .filter(|(p, _)| *p == post_id)
        .filter_map(|(_, t)| pool.iter().find(|taxon| taxon.id == *t).cloned())
        .collect();
    taxa.sort_by(|a, b| a.name.cmp(&b.name));
    taxa
}

fn replace_media(media: &mut Vec<Media>, post_id: Uuid, new: &NewMedia) {
    media.retain(|m| m.post_id != post_id);
    media.push(Media {
        id: Uuid::new_v4(),
        post_id,
        filename: new.filename.clone(),
        path: new.path.clone(),
        mime_type: new.mime_type.clone(),
    });
}

impl Tables {
    fn user(&self, id: Uuid) -> Result<User, StoreError> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| StoreError::Corrupt(format!("dangling user reference {id}")))
    }

    fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.posts
            .iter()
            .any(|p| p.slug == slug && Some(p.id) != except)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email"));
        }
        if t.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("username"));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            bio: String::new(),
            profile_pic: String::new(),
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut t = self.lock();
        if let Some(name) = &changes.username {
            if t.users.iter().any(|u| &u.username == name && u.id != id) {
                return Err(StoreError::Conflict("username"));
            }
        }
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(bio) = changes.bio {
            user.bio = bio;
        }
        if let Some(pic) = changes.profile_pic {
            user.profile_pic = pic;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl PostRepo for MemoryStore {
    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let mut guard = self.lock();
        let t = &mut *guard;
        if t.slug_taken(&post.slug, None) {
            return Err(StoreError::Conflict("slug"));
        }
        let now = OffsetDateTime::now_utc();
        let created = Post {
            id: Uuid::new_v4(),
            user_id: post.user_id,
            title: post.title,
            content: post.content,
            slug: post.slug,
            status: post.status,
            published_at: post.published_at,
            created_at: now,
            updated_at: now,
        };
        attach(&mut t.categories, &mut t.post_categories, created.id, &post.categories);
        attach(&mut t.tags, &mut t.post_tags, created.id, &post.tags);
        if let Some(media) = &post.media {
            replace_media(&mut t.media, created.id, media);
        }
        t.posts.push(created.clone());
        Ok(created)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        Ok(self.lock().posts.iter().find(|p| p.id == id).cloned())
    }

    async fn post_details(&self, id: Uuid) -> Result<Option<PostDetails>, StoreError> {
        let t = self.lock();
        let Some(post) = t.posts.iter().find(|p| p.id == id).cloned() else {
            return Ok(None);
        };
        Ok(Some(PostDetails {
            author: t.user(post.user_id)?,
            categories: taxa_for(&t.categories, &t.post_categories, id),
            tags: taxa_for(&t.tags, &t.post_tags, id),
            media: t.media.iter().find(|m| m.post_id == id).cloned(),
            post,
        }))
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
    ) -> Result<(Vec<PostWithAuthor>, i64), StoreError> {
        let t = self.lock();
        let matching: Vec<Post> = t
            .posts
            .iter()
            .filter(|p| filter.author_id.map_or(true, |a| p.user_id == a))
            .cloned()
            .collect();
        let total = matching.len() as i64;
        let items = window(&matching, filter.limit, filter.offset)
            .into_iter()
            .map(|post| {
                let author = t.user(post.user_id)?;
                Ok(PostWithAuthor { post, author })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok((items, total))
    }

    async fn update_post(
        &self,
        id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>, StoreError> {
        let mut guard = self.lock();
        let t = &mut *guard;
        if let Some(slug) = &changes.slug {
            if t.slug_taken(slug, Some(id)) {
                return Err(StoreError::Conflict("slug"));
            }
        }
        let Some(post) = t.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(slug) = changes.slug {
            post.slug = slug;
        }
        if let Some(status) = changes.status {
            post.status = status;
        }
        if post.published_at.is_none() {
            post.published_at = changes.published_at;
        }
        post.updated_at = OffsetDateTime::now_utc();
        let updated = post.clone();

        if let Some(categories) = &changes.categories {
            t.post_categories.retain(|(p, _)| *p != id);
            attach(&mut t.categories, &mut t.post_categories, id, categories);
        }
        if let Some(tags) = &changes.tags {
            t.post_tags.retain(|(p, _)| *p != id);
            attach(&mut t.tags, &mut t.post_tags, id, tags);
        }
        if let Some(media) = &changes.media {
            replace_media(&mut t.media, id, media);
        }
        Ok(Some(updated))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.lock();
        let before = t.posts.len();
        t.posts.retain(|p| p.id != id);
        if t.posts.len() == before {
            return Ok(false);
        }
        t.post_categories.retain(|(p, _)| *p != id);
        t.post_tags.retain(|(p, _)| *p != id);
        t.media.retain(|m| m.post_id != id);
        t.comments.retain(|c| c.post_id != id);
        t.likes.retain(|l| l.post_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CommentRepo for MemoryStore {
    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Comment, StoreError> {
        let mut t = self.lock();
        if !t.posts.iter().any(|p| p.id == post_id) {
            return Err(StoreError::MissingReference("post"));
        }
        let now = OffsetDateTime::now_utc();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        t.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(self.lock().comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments(
        &self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<CommentWithAuthor>, i64), StoreError> {
        let t = self.lock();
        let on_post: Vec<Comment> = t
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        let total = on_post.len() as i64;
        let items = window(&on_post, limit, offset)
            .into_iter()
            .map(|comment| {
                let author = t.user(comment.user_id)?;
                Ok(CommentWithAuthor { comment, author })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok((items, total))
    }

    async fn update_comment(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<Option<Comment>, StoreError> {
        let mut t = self.lock();
        let Some(comment) = t.comments.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        comment.content = content.to_string();
        comment.updated_at = OffsetDateTime::now_utc();
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.lock();
        let before = t.comments.len();
        t.comments.retain(|c| c.id != id);
        Ok(t.comments.len() < before)
    }
}

#[async_trait]
impl LikeRepo for MemoryStore {
    async fn create_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Like, StoreError> {
        let mut t = self.lock();
        if !t.posts.iter().any(|p| p.id == post_id) {
            return Err(StoreError::MissingReference("post"));
        }
        if t.likes
            .iter()
            .any(|l| l.post_id == post_id && l.user_id == user_id)
        {
            return Err(StoreError::Conflict("like"));
        }
        let like = Like {
            id: Uuid::new_v4(),
            user_id,
            post_id,
            created_at: OffsetDateTime::now_utc(),
        };
        t.likes.push(like.clone());
        Ok(like)
    }

    async fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.lock();
        let before = t.likes.len();
        t.likes
            .retain(|l| !(l.post_id == post_id && l.user_id == user_id));
        Ok(t.likes.len() < before)
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<i64, StoreError> {
        Ok(self.lock().likes.iter().filter(|l| l.post_id == post_id).count() as i64)
    }

    async fn has_liked(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .likes
            .iter()
            .any(|l| l.post_id == post_id && l.user_id == user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::repo_types::PostStatus;

    fn new_post(user_id: Uuid, slug: &str) -> NewPost {
        NewPost {
            user_id,
            title: slug.to_string(),
            content: String::new(),
            slug: slug.to_string(),
            status: PostStatus::Draft,
            published_at: None,
            categories: vec![NewTaxon {
                name: "misc".into(),
                description: String::new(),
            }],
            tags: vec![],
            media: None,
        }
    }

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .create_user(NewUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                password_hash: "hash".into(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn deleting_a_post_cascades() {
        let store = MemoryStore::default();
        let author = user(&store, "ann").await;
        let post = store.create_post(new_post(author.id, "p")).await.unwrap();
        store.create_comment(post.id, author.id, "hi").await.unwrap();
        store.create_like(post.id, author.id).await.unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        assert_eq!(store.count_likes(post.id).await.unwrap(), 0);
        let (comments, total) = store.list_comments(post.id, 10, 0).await.unwrap();
        assert!(comments.is_empty());
        assert_eq!(total, 0);
        assert!(!store.delete_post(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn taxa_are_shared_by_name() {
        let store = MemoryStore::default();
        let author = user(&store, "ann").await;
        let a = store.create_post(new_post(author.id, "a")).await.unwrap();
        let b = store.create_post(new_post(author.id, "b")).await.unwrap();

        let a = store.post_details(a.id).await.unwrap().unwrap();
        let b = store.post_details(b.id).await.unwrap().unwrap();
        assert_eq!(a.categories, b.categories);
    }

    #[tokio::test]
    async fn uniqueness_is_enforced() {
        let store = MemoryStore::default();
        let author = user(&store, "ann").await;
        let err = store
            .create_user(NewUser {
                username: "other".into(),
                email: "ann@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));

        store.create_post(new_post(author.id, "dup")).await.unwrap();
        let err = store.create_post(new_post(author.id, "dup")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("slug")));
    }

    #[tokio::test]
    async fn children_of_a_deleted_post_are_rejected() {
        let store = MemoryStore::default();
        let author = user(&store, "ann").await;
        let post = store.create_post(new_post(author.id, "gone")).await.unwrap();
        store.delete_post(post.id).await.unwrap();

        let err = store.create_comment(post.id, author.id, "late").await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference("post")));
        let err = store.create_like(post.id, author.id).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference("post")));
    }
}
