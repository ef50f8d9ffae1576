//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure the API can produce is one variant of `AppError`, and every variant maps
//! to a stable error code, an HTTP status and a fixed client-facing message.
//!
//! `AppError` implements `actix_web::error::ResponseError`, so handlers, extractors and
//! middleware can return it directly and the client always receives the standard envelope:
//!
//! ```json
//! { "success": false, "data": null, "error": { "code": "...", "message": "..." } }
//! ```
//!
//! Internal failures (database, hashing, configuration) carry a detail string for the logs
//! only; the response body for them is always the generic internal-error message.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;
use validator::ValidationErrors;

use crate::response::Envelope;

pub const MSG_UNAUTHORIZED: &str = "Please log in to continue.";
pub const MSG_SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";
pub const MSG_INVALID_CREDENTIALS: &str = "Invalid email or password. Please try again.";
pub const MSG_FORBIDDEN: &str = "You do not have permission to perform this action.";
pub const MSG_TASK_NOT_FOUND: &str = "This task could not be found.";
pub const MSG_NOT_FOUND: &str = "This resource could not be found.";
pub const MSG_EMAIL_EXISTS: &str =
    "An account with this email already exists. Please log in instead.";
pub const MSG_RATE_LIMITED: &str = "Too many requests. Please wait a moment and try again.";
pub const MSG_INTERNAL: &str = "Something went wrong on our end. Please try again later.";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// No credential was presented, or the account behind a valid token is gone (HTTP 401).
    Unauthorized,
    /// The token signature is valid but its expiry has passed (HTTP 401).
    SessionExpired,
    /// The token is malformed, tampered with, or names a non-UUID subject (HTTP 401).
    InvalidToken,
    /// Login failed; unknown email and wrong password are indistinguishable (HTTP 401).
    InvalidCredentials,
    /// The `{user_id}` in the path is not the authenticated user (HTTP 403).
    Forbidden,
    /// The task does not exist or belongs to someone else (HTTP 404).
    TaskNotFound,
    /// No route matched the request (HTTP 404).
    NotFound,
    /// Registration with an email that is already taken (HTTP 409).
    EmailAlreadyExists,
    /// Input rejected by a domain policy such as email format or password strength (HTTP 400).
    BadRequest(String),
    /// Payload, path or query could not be parsed or failed field validation (HTTP 422).
    ValidationError(String),
    /// The caller exhausted its quota for the current window (HTTP 429).
    RateLimited,
    /// The rate limiter backend is unreachable and the policy is fail-closed (HTTP 503).
    ServiceUnavailable,
    /// Represents an unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// Represents an error originating from database operations (HTTP 500).
    DatabaseError(String),
    /// Startup configuration is missing or malformed.
    ConfigError(String),
}

impl AppError {
    /// Stable machine-readable code placed in `error.code`.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::SessionExpired => "SESSION_EXPIRED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Forbidden => "FORBIDDEN",
            AppError::TaskNotFound => "TASK_NOT_FOUND",
            AppError::NotFound => "NOT_FOUND",
            AppError::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            AppError::BadRequest(_) | AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::RateLimited => "RATE_LIMITED",
            AppError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            AppError::InternalServerError(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigError(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message placed in `error.message`.
    pub fn message(&self) -> &str {
        match self {
            AppError::Unauthorized => MSG_UNAUTHORIZED,
            AppError::SessionExpired | AppError::InvalidToken => MSG_SESSION_EXPIRED,
            AppError::InvalidCredentials => MSG_INVALID_CREDENTIALS,
            AppError::Forbidden => MSG_FORBIDDEN,
            AppError::TaskNotFound => MSG_TASK_NOT_FOUND,
            AppError::NotFound => MSG_NOT_FOUND,
            AppError::EmailAlreadyExists => MSG_EMAIL_EXISTS,
            AppError::BadRequest(msg) | AppError::ValidationError(msg) => msg,
            AppError::RateLimited => MSG_RATE_LIMITED,
            AppError::ServiceUnavailable
            | AppError::InternalServerError(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigError(_) => MSG_INTERNAL,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::InternalServerError(detail) => {
                write!(f, "Internal Server Error: {}", detail)
            }
            AppError::DatabaseError(detail) => write!(f, "Database Error: {}", detail),
            AppError::ConfigError(detail) => write!(f, "Configuration Error: {}", detail),
            other => write!(f, "{}: {}", other.code(), other.message()),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts `AppError` variants into enveloped `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized
            | AppError::SessionExpired
            | AppError::InvalidToken
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::TaskNotFound | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(Envelope::<()>::failure(
            self.code(),
            self.message(),
        ))
    }
}

/// Converts `sqlx::Error` into `AppError::DatabaseError`.
///
/// The detail is logged here and never reaches the client.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        log::error!("database error: {}", error);
        AppError::DatabaseError(error.to_string())
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::InternalServerError`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        log::error!("password hashing failed: {}", error);
        AppError::InternalServerError(error.to_string())
    }
}

/// Converts a failed `web::block` call (cancelled or panicked worker).
impl From<actix_web::error::BlockingError> for AppError {
    fn from(error: actix_web::error::BlockingError) -> AppError {
        log::error!("blocking task failed: {}", error);
        AppError::InternalServerError(error.to_string())
    }
}
