use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{CreatePostRequest, MediaInput, TaxonInput, UpdatePostRequest};
use super::repo_types::{NewMedia, NewPost, NewTaxon, Post, PostChanges, PostStatus};
use crate::error::AppError;

const MAX_TITLE_LEN: usize = 200;

fn is_valid_slug(slug: &str) -> bool {
    lazy_static! {
        static ref SLUG_RE: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
    }
    SLUG_RE.is_match(slug)
}

/// Lowercases, keeps ASCII alphanumerics, collapses everything else into single dashes.
pub(crate) fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::validation("title is too long"));
    }
    Ok(title.to_string())
}

fn validate_slug(slug: &str) -> Result<String, AppError> {
    let slug = slug.trim();
    if !is_valid_slug(slug) {
        return Err(AppError::validation(
            "slug must be lowercase letters and digits separated by single dashes",
        ));
    }
    Ok(slug.to_string())
}

/// Trims names, rejects blanks, drops repeated names keeping the first.
fn taxa(items: Vec<TaxonInput>, what: &str) -> Result<Vec<NewTaxon>, AppError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let name = item.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation(format!("{what} name is required")));
        }
        if seen.insert(name.clone()) {
            out.push(NewTaxon {
                name,
                description: item.description.trim().to_string(),
            });
        }
    }
    Ok(out)
}

fn media(input: MediaInput) -> Result<NewMedia, AppError> {
    let filename = input.filename.trim();
    let path = input.path.trim();
    let mime_type = input.mime_type.trim();
    if filename.is_empty() || path.is_empty() || mime_type.is_empty() {
        return Err(AppError::validation("media needs filename, path and mime_type"));
    }
    Ok(NewMedia {
        filename: filename.to_string(),
        path: path.to_string(),
        mime_type: mime_type.to_string(),
    })
}

pub fn new_post(
    user_id: Uuid,
    req: CreatePostRequest,
    now: OffsetDateTime,
) -> Result<NewPost, AppError> {
    let title = validate_title(&req.title)?;
    let slug = match req.slug.as_deref() {
        Some(s) => validate_slug(s)?,
        None => {
            let derived = slugify(&title);
            if derived.is_empty() {
                return Err(AppError::validation(
                    "slug cannot be derived from title; provide one",
                ));
            }
            derived
        }
    };

    Ok(NewPost {
        user_id,
        title,
        content: req.content,
        slug,
        status: req.status,
        published_at: (req.status == PostStatus::Published).then_some(now),
        categories: taxa(req.categories, "category")?,
        tags: taxa(req.tags, "tag")?,
        media: req.media.map(media).transpose()?,
    })
}

/// `published_at` is stamped the first time a post becomes published.
pub fn post_changes(
    existing: &Post,
    req: UpdatePostRequest,
    now: OffsetDateTime,
) -> Result<PostChanges, AppError> {
    let publishing = req.status == Some(PostStatus::Published) && existing.published_at.is_none();

    Ok(PostChanges {
        title: req.title.as_deref().map(validate_title).transpose()?,
        content: req.content,
        slug: req.slug.as_deref().map(validate_slug).transpose()?,
        status: req.status,
        published_at: publishing.then_some(now),
        categories: req.categories.map(|c| taxa(c, "category")).transpose()?,
        tags: req.tags.map(|t| taxa(t, "tag")).transpose()?,
        media: req.media.map(media).transpose()?,
    })
}
