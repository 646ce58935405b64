use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, SignupRequest, UpdateProfileRequest},
        extractors::CurrentUser,
        repo::UserRepo,
        services,
    },
    error::AppError,
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).put(update_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = services::signup(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let now = OffsetDateTime::now_utc();
    let (user, token) = services::login(&state, payload, now).await?;
    Ok(Json(AuthResponse {
        token,
        token_type: "Bearer",
        expires_at: now + state.keys.ttl(),
        user: user.into(),
    }))
}

#[instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .store
        .find_user_by_id(identity.id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::update_profile(&state, &identity, payload).await?;
    Ok(Json(user.into()))
}
