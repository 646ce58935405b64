use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{LikeResponse, LikesSummary},
    repo::LikeRepo,
};
use crate::{
    auth::extractors::CurrentUser, error::AppError, extract::AppPath, posts::repo::PostRepo,
    state::AppState,
};

pub fn like_routes() -> Router<AppState> {
    Router::new().route(
        "/posts/:post_id/likes",
        post(like_post).get(get_likes).delete(unlike_post),
    )
}

async fn ensure_post_exists(state: &AppState, post_id: Uuid) -> Result<(), AppError> {
    state
        .store
        .find_post(post_id)
        .await?
        .map(|_| ())
        .ok_or(AppError::NotFound("post"))
}

#[instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn like_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(post_id): AppPath<Uuid>,
) -> Result<(StatusCode, Json<LikeResponse>), AppError> {
    ensure_post_exists(&state, post_id).await?;

    // uniqueness is enforced by the store; a second like surfaces as a conflict
    let like = state.store.create_like(post_id, identity.id).await?;
    info!(%post_id, "post liked");
    Ok((StatusCode::CREATED, Json(like.into())))
}

#[instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn get_likes(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(post_id): AppPath<Uuid>,
) -> Result<Json<LikesSummary>, AppError> {
    ensure_post_exists(&state, post_id).await?;

    let likes_count = state.store.count_likes(post_id).await?;
    let liked_by_me = state.store.has_liked(post_id, identity.id).await?;
    Ok(Json(LikesSummary {
        post_id,
        likes_count,
        liked_by_me,
    }))
}

#[instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn unlike_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(post_id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    ensure_post_exists(&state, post_id).await?;

    if !state.store.delete_like(post_id, identity.id).await? {
        return Err(AppError::NotFound("like"));
    }
    info!(%post_id, "post unliked");
    Ok(StatusCode::NO_CONTENT)
}
