pub mod authorize;
pub mod credentials;
pub mod extractors;
pub mod guard;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// Re-export necessary items
pub use authorize::{
    authorize_task_path, enforce_path_owner, fetch_owned_task, parse_task_id, require_owned,
};
pub use credentials::{extract_token, SESSION_COOKIE};
pub use extractors::AuthenticatedUser;
pub use guard::{resolve_principal, Principal};
pub use password::{hash_password, verify_password};
pub use token::{Claims, SessionClaims, TokenCodec};

pub const MSG_INVALID_EMAIL: &str = "Please enter a valid email address.";
pub const MSG_WEAK_PASSWORD: &str = "Password must be at least 8 characters and contain at least one uppercase letter, one lowercase letter, and one number.";

lazy_static! {
    static ref EMAIL_REGEX: regex::Regex =
        regex::Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").unwrap();
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    /// Normalized before validation, so surrounding whitespace and case are ignored.
    pub email: String,
    /// At least 8 characters with an uppercase letter, a lowercase letter and a digit.
    pub password: String,
}

/// Body returned after a successful login or registration.
/// The same token is also set as the `access_token` cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
}

impl AuthToken {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email_format(email: &str) -> Result<(), AppError> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(AppError::BadRequest(MSG_INVALID_EMAIL.into()))
    }
}

pub fn validate_password_policy(password: &str) -> Result<(), AppError> {
    let strong = password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit());

    if strong {
        Ok(())
    } else {
        Err(AppError::BadRequest(MSG_WEAK_PASSWORD.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_email_format_validation() {
        assert!(validate_email_format("ada@example.com").is_ok());
        assert!(validate_email_format("first.last+tag@sub.example.io").is_ok());

        for bad in ["adaexample.com", "ada@example", "ada@.c", "@example.com", ""] {
            match validate_email_format(bad) {
                Err(AppError::BadRequest(msg)) => assert_eq!(msg, MSG_INVALID_EMAIL),
                other => panic!("expected rejection for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password_policy("Password1").is_ok());

        for weak in ["Pass1", "password1", "PASSWORD1", "Password", ""] {
            match validate_password_policy(weak) {
                Err(AppError::BadRequest(msg)) => assert_eq!(msg, MSG_WEAK_PASSWORD),
                other => panic!("expected rejection for {:?}, got {:?}", weak, other),
            }
        }
    }
}
