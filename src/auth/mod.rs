use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod jwt;
mod password;
pub mod repo;
pub mod repo_types;
mod services;

pub use dto::{PublicAuthor, PublicUser};

/// Routes reachable without a token.
pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}

/// Profile routes; mounted behind the auth layer.
pub fn me_router() -> Router<AppState> {
    handlers::me_routes()
}
