use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{LoginRequest, SignupRequest, UpdateProfileRequest},
    extractors::Identity,
    password::{hash_password, verify_dummy, verify_password},
    repo::UserRepo,
    repo_types::{NewUser, ProfileChanges, User},
};
use crate::{error::AppError, state::AppState, store::StoreError};

const MAX_USERNAME_LEN: usize = 50;
const DERIVED_SUFFIX_LEN: usize = 6;
const MAX_DERIVE_ATTEMPTS: u32 = 5;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() {
        return Err(AppError::validation("username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::validation("username is too long"));
    }
    Ok(())
}

/// Verifies a bearer token and resolves its subject to a stored user.
/// Every failure is reported as [`AppError::Unauthenticated`].
pub async fn authenticate(
    state: &AppState,
    token: &str,
    now: OffsetDateTime,
) -> Result<Identity, AppError> {
    let claims = state.keys.verify(token, now).map_err(|e| {
        warn!(reason = %e, "token rejected");
        AppError::Unauthenticated
    })?;

    match state.store.find_user_by_id(claims.sub).await? {
        Some(user) => Ok(Identity::from(&user)),
        None => {
            warn!(user_id = %claims.sub, "token subject has no stored user");
            Err(AppError::Unauthenticated)
        }
    }
}

/// Username taken from the email's local part, keeping only `[a-z0-9._-]`.
fn username_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let name: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(MAX_USERNAME_LEN - DERIVED_SUFFIX_LEN - 1)
        .collect();
    if name.is_empty() {
        "user".to_string()
    } else {
        name
    }
}

fn with_suffix(base: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{base}-{}", &id[..DERIVED_SUFFIX_LEN])
}

pub async fn signup(state: &AppState, payload: SignupRequest) -> Result<User, AppError> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("invalid email"));
    }
    let requested = payload.username.map(|u| u.trim().to_string());
    if let Some(u) = &requested {
        validate_username(u)?;
    }
    if payload.password.is_empty() {
        return Err(AppError::validation("password is required"));
    }

    let password_hash = hash_password(&payload.password)?;
    let derived = requested.is_none();
    let base = requested.unwrap_or_else(|| username_from_email(&email));
    let mut username = base.clone();

    // a derived name that collides gets a short random suffix
    let mut attempts = 0;
    let user = loop {
        let result = state
            .store
            .create_user(NewUser {
                username: username.clone(),
                email: email.clone(),
                password_hash: password_hash.clone(),
            })
            .await;
        match result {
            Err(StoreError::Conflict("username")) if derived && attempts < MAX_DERIVE_ATTEMPTS => {
                attempts += 1;
                username = with_suffix(&base);
            }
            other => break other?,
        }
    };

    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Checks credentials and issues a token. Unknown email and wrong password
/// are indistinguishable to the caller.
pub async fn login(
    state: &AppState,
    payload: LoginRequest,
    now: OffsetDateTime,
) -> Result<(User, String), AppError> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("invalid email"));
    }

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        verify_dummy(&payload.password);
        warn!("login for unknown email");
        return Err(AppError::Unauthenticated);
    };

    if !verify_password(&payload.password, &user.password_hash) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthenticated);
    }

    let token = state.keys.sign(user.id, now)?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, token))
}

pub async fn update_profile(
    state: &AppState,
    identity: &Identity,
    payload: UpdateProfileRequest,
) -> Result<User, AppError> {
    let username = payload.username.map(|u| u.trim().to_string());
    if let Some(u) = &username {
        validate_username(u)?;
    }

    let changes = ProfileChanges {
        username,
        bio: payload.bio,
        profile_pic: payload.profile_pic,
    };
    state
        .store
        .update_profile(identity.id, changes)
        .await?
        .ok_or(AppError::NotFound("user"))
}
