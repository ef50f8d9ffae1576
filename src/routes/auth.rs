use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{get, post, web, HttpResponse};
use serde_json::json;

use crate::{
    auth::{
        hash_password, normalize_email, validate_email_format, validate_password_policy,
        verify_password, AuthToken, AuthenticatedUser, LoginRequest, RegisterRequest,
        SESSION_COOKIE,
    },
    config::CookieSettings,
    error::AppError,
    models::{NewUser, UserProfile},
    response::Envelope,
    state::AppState,
};

fn session_cookie(settings: &CookieSettings, value: String, max_age_seconds: i64) -> Cookie<'static> {
    let mut builder = Cookie::build(SESSION_COOKIE, value)
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_seconds));
    if let Some(domain) = &settings.domain {
        builder = builder.domain(domain.clone());
    }
    builder.finish()
}

/// Register a new user
///
/// Creates an account, sets the `access_token` cookie and returns the same token in the body
/// for non-browser clients.
///
/// ## Responses:
/// - `201 Created`: `{access_token, token_type: "bearer"}`.
/// - `400 Bad Request`: Invalid email format or weak password (`VALIDATION_ERROR`).
/// - `409 Conflict`: The email is already registered (`EMAIL_ALREADY_EXISTS`).
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let RegisterRequest { email, password } = register_data.into_inner();
    let email = normalize_email(&email);
    validate_email_format(&email)?;
    validate_password_policy(&password)?;

    if state.users.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::EmailAlreadyExists);
    }

    let cost = state.bcrypt_cost;
    let hashed_password = web::block(move || hash_password(&password, cost)).await??;

    let user = state
        .users
        .create_user(NewUser {
            email,
            hashed_password,
        })
        .await?;
    let token = state.tokens.issue(user.id, &user.email)?;
    log::info!("registered user {}", user.id);

    Ok(HttpResponse::Created()
        .cookie(session_cookie(
            &state.cookies,
            token.clone(),
            state.tokens.lifetime_seconds(),
        ))
        .json(Envelope::ok(AuthToken::bearer(token))))
}

/// Login user
///
/// ## Responses:
/// - `200 OK`: `{access_token, token_type: "bearer"}`, plus the `access_token` cookie.
/// - `401 Unauthorized`: Unknown email or wrong password; both give `INVALID_CREDENTIALS`.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let LoginRequest { email, password } = login_data.into_inner();
    let email = normalize_email(&email);

    let user = state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let hashed_password = user.hashed_password.clone();
    let valid = web::block(move || verify_password(&hashed_password, &password)).await?;
    if !valid {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens.issue(user.id, &user.email)?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(
            &state.cookies,
            token.clone(),
            state.tokens.lifetime_seconds(),
        ))
        .json(Envelope::ok(AuthToken::bearer(token))))
}

/// Logout
///
/// Clears the session cookie. Tokens are stateless, so this always succeeds.
#[post("/logout")]
pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(session_cookie(&state.cookies, String::new(), 0))
        .json(Envelope::ok(json!({ "logged_out": true })))
}

/// Current user
///
/// ## Responses:
/// - `200 OK`: `{id, email}` of the authenticated caller.
/// - `401 Unauthorized`: `UNAUTHORIZED`, `SESSION_EXPIRED` or `INVALID_TOKEN`.
#[get("/me")]
pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    let AuthenticatedUser(principal) = user;
    HttpResponse::Ok().json(Envelope::ok(UserProfile {
        id: principal.id,
        email: principal.email,
    }))
}
