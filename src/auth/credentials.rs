use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpRequest;

/// Name of the cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "access_token";

/// Finds the candidate session token on a request.
///
/// An `Authorization: Bearer <token>` header wins over the `access_token` cookie.
/// Empty values count as absent. `None` means no credential was presented at all,
/// which callers must keep distinct from a credential that fails verification.
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    if from_header.is_some() {
        return from_header;
    }

    req.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
}
