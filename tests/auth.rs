#[macro_use]
mod common;

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::test;
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::{assert_error, register_user, relaxed_policy, test_context, PASSWORD};

#[actix_rt::test]
async fn test_register_login_and_me_flow() {
    let ctx = test_context(relaxed_policy());
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "email": "flow@example.com", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "access_token")
        .map(Cookie::into_owned)
        .expect("session cookie set on registration");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(86_400)));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert!(body["error"].is_null());
    assert_eq!(body["data"]["token_type"], "bearer");
    assert_eq!(body["data"]["access_token"].as_str(), Some(cookie.value()));

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "flow@example.com", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let login: Value = test::read_body_json(resp).await;
    let token = login["data"]["access_token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = test::read_body_json(resp).await;
    assert_eq!(me["data"]["email"], "flow@example.com");

    let claims = ctx.tokens.verify(&token).unwrap();
    assert_eq!(me["data"]["id"], claims.subject_id.to_string());
}

#[actix_rt::test]
async fn test_register_normalizes_email_and_rejects_duplicate() {
    let ctx = test_context(relaxed_policy());
    let app = test_app!(ctx);

    let user = register_user(&app, "  Ada@Example.COM ").await;
    assert_eq!(user.email, "  Ada@Example.COM ");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(user.bearer())
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["data"]["email"], "ada@example.com");

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "email": "ada@example.com", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_error(&body, "EMAIL_ALREADY_EXISTS");
    assert_eq!(
        body["error"]["message"],
        "An account with this email already exists. Please log in instead."
    );
}

#[actix_rt::test]
async fn test_invalid_registration_inputs() {
    let ctx = test_context(relaxed_policy());
    let app = test_app!(ctx);

    let test_cases = vec![
        (
            json!({ "email": "invalid-email", "password": PASSWORD }),
            StatusCode::BAD_REQUEST,
            "invalid email format",
        ),
        (
            json!({ "email": "weak@example.com", "password": "short1A" }),
            StatusCode::BAD_REQUEST,
            "password too short",
        ),
        (
            json!({ "email": "weak@example.com", "password": "alllowercase1" }),
            StatusCode::BAD_REQUEST,
            "password without uppercase",
        ),
        (
            json!({ "email": "weak@example.com", "password": "NoDigitsHere" }),
            StatusCode::BAD_REQUEST,
            "password without digit",
        ),
        (
            json!({ "password": PASSWORD }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "missing email",
        ),
        (
            json!({ "email": "weak@example.com" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "missing password",
        ),
    ];

    for (payload, expected_status, description) in test_cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected_status, "case: {}", description);

        let body: Value = test::read_body_json(resp).await;
        assert_error(&body, "VALIDATION_ERROR");
    }
}

#[actix_rt::test]
async fn test_malformed_json_is_validation_error() {
    let ctx = test_context(relaxed_policy());
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_error(&body, "VALIDATION_ERROR");
}

#[actix_rt::test]
async fn test_login_failures_are_indistinguishable() {
    let ctx = test_context(relaxed_policy());
    let app = test_app!(ctx);
    register_user(&app, "known@example.com").await;

    let mut bodies = Vec::new();
    for (email, password) in [
        ("known@example.com", "WrongPassword1"),
        ("unknown@example.com", PASSWORD),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": email, "password": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.response().cookies().next().is_none());
        let body: Value = test::read_body_json(resp).await;
        assert_error(&body, "INVALID_CREDENTIALS");
        bodies.push(body);
    }

    assert_eq!(bodies[0], bodies[1]);
}

#[actix_rt::test]
async fn test_session_error_taxonomy() {
    let ctx = test_context(relaxed_policy());
    let app = test_app!(ctx);
    let user = register_user(&app, "taxonomy@example.com").await;

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_error(&body, "UNAUTHORIZED");
    assert_eq!(body["error"]["message"], "Please log in to continue.");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", "Bearer not.a.token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_error(&body, "INVALID_TOKEN");

    let expired = ctx
        .tokens
        .issue_at(user.id, &user.email, Utc::now().timestamp() - 2 * 86_400)
        .unwrap();
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", expired)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_error(&body, "SESSION_EXPIRED");
    assert_eq!(
        body["error"]["message"],
        "Your session has expired. Please log in again."
    );
}

#[actix_rt::test]
async fn test_cookie_authentication_and_header_precedence() {
    let ctx = test_context(relaxed_policy());
    let app = test_app!(ctx);
    let user = register_user(&app, "cookie@example.com").await;

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .cookie(Cookie::new("access_token", user.token.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // A bad header is not rescued by a good cookie.
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", "Bearer tampered"))
        .cookie(Cookie::new("access_token", user.token.clone()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_error(&body, "INVALID_TOKEN");
}

#[actix_rt::test]
async fn test_logout_clears_cookie() {
    let ctx = test_context(relaxed_policy());
    let app = test_app!(ctx);

    let req = test::TestRequest::post().uri("/api/auth/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "access_token")
        .map(Cookie::into_owned)
        .expect("logout resets the session cookie");
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["logged_out"], true);
}

#[actix_rt::test]
async fn test_token_for_deleted_account_is_unauthorized() {
    let ctx = test_context(relaxed_policy());
    let app = test_app!(ctx);
    let user = register_user(&app, "deleted@example.com").await;

    assert!(ctx.store.delete_user(user.id).unwrap());

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(user.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_error(&body, "UNAUTHORIZED");
}

#[actix_rt::test]
async fn test_health_and_unknown_routes() {
    let ctx = test_context(relaxed_policy());
    let app = test_app!(ctx);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "healthy");

    let req = test::TestRequest::get().uri("/no/such/route").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_error(&body, "NOT_FOUND");
}
