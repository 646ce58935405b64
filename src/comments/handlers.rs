use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CommentListQuery, CommentRequest, CommentResponse},
    repo::CommentRepo,
    repo_types::Comment,
};
use crate::{
    auth::{
        extractors::CurrentUser,
        guard::{authorize, Action},
    },
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    pagination::{Page, Paginated},
    posts::repo::PostRepo,
    state::AppState,
};

const MAX_COMMENT_LEN: usize = 5000;

pub fn comment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/posts/:post_id/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/posts/:post_id/comments/:comment_id",
            put(update_comment).delete(delete_comment),
        )
}

fn validate_content(content: &str) -> Result<&str, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::validation("content is required"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::validation("content is too long"));
    }
    Ok(content)
}

async fn ensure_post_exists(state: &AppState, post_id: Uuid) -> Result<(), AppError> {
    match state.store.find_post(post_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("post")),
    }
}

/// Loads a comment and checks it belongs to the post named in the path.
async fn load_comment(
    state: &AppState,
    post_id: Uuid,
    comment_id: Uuid,
) -> Result<Comment, AppError> {
    state
        .store
        .find_comment(comment_id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or(AppError::NotFound("comment"))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(post_id): AppPath<Uuid>,
    AppJson(payload): AppJson<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), AppError> {
    let content = validate_content(&payload.content)?;
    ensure_post_exists(&state, post_id).await?;

    let comment = state
        .store
        .create_comment(post_id, identity.id, content)
        .await?;
    info!(comment_id = %comment.id, %post_id, "comment created");
    Ok((StatusCode::CREATED, Json(comment.into())))
}

#[instrument(skip(state, _identity))]
pub async fn list_comments(
    State(state): State<AppState>,
    CurrentUser(_identity): CurrentUser,
    AppPath(post_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<CommentListQuery>,
) -> Result<Json<Paginated<CommentResponse>>, AppError> {
    ensure_post_exists(&state, post_id).await?;

    let page = Page::new(query.page, query.page_size);
    let (comments, total) = state
        .store
        .list_comments(post_id, page.limit(), page.offset())
        .await?;
    let items = comments.into_iter().map(Into::into).collect();
    Ok(Json(Paginated::new(items, total, page)))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath((post_id, comment_id)): AppPath<(Uuid, Uuid)>,
    AppJson(payload): AppJson<CommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let comment = load_comment(&state, post_id, comment_id).await?;
    authorize(&identity, comment.user_id, Action::Update)?;
    let content = validate_content(&payload.content)?;

    let updated = state
        .store
        .update_comment(comment_id, content)
        .await?
        .ok_or(AppError::NotFound("comment"))?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath((post_id, comment_id)): AppPath<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let comment = load_comment(&state, post_id, comment_id).await?;
    authorize(&identity, comment.user_id, Action::Delete)?;

    if !state.store.delete_comment(comment_id).await? {
        return Err(AppError::NotFound("comment"));
    }
    info!(%comment_id, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
