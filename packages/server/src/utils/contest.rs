use sea_orm::{ConnectionTrait, EntityTrait};

use crate::entity::{contest, contest_participant};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;

/// Look up a contest by ID, returning 404 if not found.
pub async fn find_contest<C: ConnectionTrait>(db: &C, id: i32) -> Result<contest::Model, AppError> {
    contest::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Contest not found".into()))
}

pub async fn is_participant<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    user_id: i32,
) -> Result<bool, AppError> {
    Ok(contest_participant::Entity::find_by_id((contest_id, user_id))
        .one(db)
        .await?
        .is_some())
}

/// Verify the caller can read the given contest's results.
///
/// Private contests are reported as missing to outsiders. Holders of
/// `contest:manage` or `submission:view_all` see every contest.
pub async fn check_contest_access<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    contest: &contest::Model,
) -> Result<(), AppError> {
    if contest.is_public
        || auth_user.has_permission("contest:manage")
        || auth_user.has_permission("submission:view_all")
    {
        return Ok(());
    }
    if is_participant(db, contest.id, auth_user.user_id).await? {
        return Ok(());
    }
    Err(AppError::NotFound("Contest not found".into()))
}
