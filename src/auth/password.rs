use crate::error::AppError;
use bcrypt::{hash, verify};

/// Hashes a password with bcrypt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored bcrypt hash.
///
/// A malformed hash verifies as `false` instead of failing the request.
pub fn verify_password(hashed_password: &str, password: &str) -> bool {
    verify(password, hashed_password).unwrap_or_else(|e| {
        log::warn!("stored password hash could not be verified: {}", e);
        false
    })
}
