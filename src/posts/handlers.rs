use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreatePostRequest, PostListQuery, PostResponse, PostSummary, UpdatePostRequest},
    repo::PostRepo,
    repo_types::PostFilter,
    services,
};
use crate::{
    auth::{
        extractors::CurrentUser,
        guard::{authorize, Action},
    },
    comments::repo::CommentRepo,
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    likes::repo::LikeRepo,
    pagination::{Page, Paginated, DEFAULT_PAGE_SIZE},
    state::AppState,
};

pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/:post_id",
            get(get_post).put(update_post).delete(delete_post),
        )
}

async fn load_details(state: &AppState, post_id: Uuid) -> Result<PostResponse, AppError> {
    state
        .store
        .post_details(post_id)
        .await?
        .map(PostResponse::from)
        .ok_or(AppError::NotFound("post"))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppJson(payload): AppJson<CreatePostRequest>,
) -> Result<(StatusCode, HeaderMap, Json<PostResponse>), AppError> {
    let new_post = services::new_post(identity.id, payload, OffsetDateTime::now_utc())?;
    let post = state.store.create_post(new_post).await?;
    info!(post_id = %post.id, slug = %post.slug, "post created");

    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&format!("/api/v1/posts/{}", post.id)) {
        Ok(location) => {
            headers.insert(header::LOCATION, location);
        }
        Err(e) => error!(error = %e, "location header"),
    }

    let body = load_details(&state, post.id).await?;
    Ok((StatusCode::CREATED, headers, Json(body)))
}

#[instrument(skip(state, _identity))]
pub async fn list_posts(
    State(state): State<AppState>,
    CurrentUser(_identity): CurrentUser,
    AppQuery(query): AppQuery<PostListQuery>,
) -> Result<Json<Paginated<PostSummary>>, AppError> {
    let page = Page::new(query.page, query.page_size);
    let filter = PostFilter {
        author_id: query.author_id,
        limit: page.limit(),
        offset: page.offset(),
    };
    let (posts, total) = state.store.list_posts(filter).await?;
    let items = posts.into_iter().map(Into::into).collect();
    Ok(Json(Paginated::new(items, total, page)))
}

/// Post with author, taxonomy, media, like count and the first page of comments.
#[instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn get_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(post_id): AppPath<Uuid>,
) -> Result<Json<PostResponse>, AppError> {
    let mut body = load_details(&state, post_id).await?;
    authorize(&identity, body.author.id, Action::Read)?;

    let (comments, total_comments) = state
        .store
        .list_comments(post_id, DEFAULT_PAGE_SIZE, 0)
        .await?;
    body.likes_count = Some(state.store.count_likes(post_id).await?);
    body.comments = Some(comments.into_iter().map(Into::into).collect());
    body.comments_count = Some(total_comments);
    Ok(Json(body))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(post_id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdatePostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let existing = state
        .store
        .find_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    authorize(&identity, existing.user_id, Action::Update)?;

    let changes = services::post_changes(&existing, payload, OffsetDateTime::now_utc())?;
    state
        .store
        .update_post(post_id, changes)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    info!(%post_id, "post updated");

    Ok(Json(load_details(&state, post_id).await?))
}

#[instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(post_id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    let existing = state
        .store
        .find_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    authorize(&identity, existing.user_id, Action::Delete)?;

    if !state.store.delete_post(post_id).await? {
        return Err(AppError::NotFound("post"));
    }
    info!(%post_id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}
