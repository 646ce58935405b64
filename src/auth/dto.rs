use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    /// Derived from the email when absent.
    #[serde(default)]
    pub username: Option<String>,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub profile_pic: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            bio: u.bio,
            profile_pic: u.profile_pic,
            created_at: u.created_at,
        }
    }
}

/// Author as embedded in posts and comments; contact details stay private.
#[derive(Debug, Clone, Serialize)]
pub struct PublicAuthor {
    pub id: Uuid,
    pub username: String,
    pub bio: String,
    pub profile_pic: String,
}

impl From<User> for PublicAuthor {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            bio: u.bio,
            profile_pic: u.profile_pic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_never_carries_password() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: "ann".into(),
            email: "test@example.com".into(),
            password_hash: "$argon2id$v=19$secret-hash".into(),
            bio: String::new(),
            profile_pic: String::new(),
            created_at: now,
            updated_at: now,
        };

        let raw = serde_json::to_string(&user).unwrap();
        assert!(!raw.contains("secret-hash"));

        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn embedded_author_hides_email() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: "ann".into(),
            email: "ann@example.com".into(),
            password_hash: "hash".into(),
            bio: "writes things".into(),
            profile_pic: String::new(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(PublicAuthor::from(user)).unwrap();
        assert_eq!(json["username"], "ann");
        assert_eq!(json["bio"], "writes things");
        assert!(json.get("email").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
