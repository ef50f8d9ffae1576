use serde::Serialize;
use uuid::Uuid;

use super::token::TokenCodec;
use crate::error::AppError;
use crate::store::UserStore;

/// The authenticated caller, resolved fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
}

/// Turns a presented credential into a `Principal`.
///
/// * no credential: `Unauthorized`
/// * bad token: `InvalidToken`; expired token: `SessionExpired`
/// * valid token for an account that no longer exists: `Unauthorized`, so a deleted
///   account looks the same as an anonymous caller.
pub async fn resolve_principal(
    codec: &TokenCodec,
    users: &dyn UserStore,
    credential: Option<&str>,
) -> Result<Principal, AppError> {
    let token = credential.ok_or(AppError::Unauthorized)?;
    let claims = codec.verify(token)?;

    let user = users
        .find_user_by_id(claims.subject_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Principal {
        id: user.id,
        email: user.email,
    })
}
