use uuid::Uuid;

use super::extractors::Identity;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
}

/// Reads are open to every authenticated user; mutations only to the owner.
pub fn authorize(identity: &Identity, owner_id: Uuid, action: Action) -> Result<(), AppError> {
    match action {
        Action::Read => Ok(()),
        Action::Update | Action::Delete if identity.id == owner_id => Ok(()),
        Action::Update | Action::Delete => {
            tracing::warn!(user_id = %identity.id, %owner_id, ?action, "ownership check denied");
            Err(AppError::Forbidden)
        }
    }
}
