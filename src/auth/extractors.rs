use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, error};
use uuid::Uuid;

use super::{repo_types::User, services};
use crate::{error::AppError, state::AppState};

/// The authenticated user attached to a request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for Identity {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
        }
    }
}

/// Reads the `Bearer` token out of the Authorization header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Route layer for protected routes: resolves the token to an [`Identity`]
/// and stores it in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(req.headers()) else {
        debug!("missing or malformed Authorization header");
        return Err(AppError::Unauthenticated);
    };

    let identity = services::authenticate(&state, token, OffsetDateTime::now_utc()).await?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Typed accessor for the identity placed by [`require_auth`].
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                error!(path = %parts.uri.path(), "no identity on request; route is missing the auth layer");
                AppError::Unauthenticated
            })
    }
}
