#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web};
use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use focentra::auth::TokenCodec;
use focentra::clock::{Clock, ManualClock};
use focentra::config::CookieSettings;
use focentra::rate_limit::{
    InMemoryBackend, RateLimitBackend, RateLimitError, RateLimitPolicy, RateLimiter,
};
use focentra::store::MemoryStore;
use focentra::AppState;

pub const JWT_SECRET: &str = "integration_test_secret";
pub const PASSWORD: &str = "Password123";

/// Shared pieces of a test application.
pub struct TestContext {
    pub state: web::Data<AppState>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub tokens: Arc<TokenCodec>,
}

pub fn relaxed_policy() -> RateLimitPolicy {
    RateLimitPolicy {
        authenticated_limit: 10_000,
        unauthenticated_limit: 10_000,
        window_seconds: 3600,
        fail_open: true,
    }
}

/// In-memory stores, in-memory counters and a manual clock.
pub fn test_context(policy: RateLimitPolicy) -> TestContext {
    let clock = Arc::new(ManualClock::new(Duration::from_secs(1_700_000_000)));
    let backend: Arc<dyn RateLimitBackend> = Arc::new(InMemoryBackend::new(clock.clone()));
    test_context_with_backend(policy, backend, clock)
}

pub fn test_context_with_backend(
    policy: RateLimitPolicy,
    backend: Arc<dyn RateLimitBackend>,
    clock: Arc<ManualClock>,
) -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let tokens = Arc::new(TokenCodec::new(JWT_SECRET, 86_400));
    let limiter_clock: Arc<dyn Clock> = clock.clone();
    let rate_limiter = Arc::new(RateLimiter::new(
        backend,
        tokens.clone(),
        policy,
        limiter_clock,
    ));

    let state = AppState::new(
        store.clone(),
        store.clone(),
        tokens.clone(),
        rate_limiter,
        CookieSettings::default(),
        4,
    );

    TestContext {
        state: web::Data::new(state),
        store,
        clock,
        tokens,
    }
}

/// A counter backend that is always down.
pub struct FailingBackend;

#[async_trait]
impl RateLimitBackend for FailingBackend {
    async fn increment(&self, _: &str, _: u64, _: u64) -> Result<bool, RateLimitError> {
        Err(RateLimitError::Backend("connection refused".into()))
    }
}

/// Builds the full application around a `TestContext`.
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.state.clone())
                .wrap(focentra::rate_limit::RateLimitMiddleware::new(
                    $ctx.state.rate_limiter.clone(),
                ))
                .configure(focentra::routes::config)
                .default_service(actix_web::web::to(focentra::routes::not_found)),
        )
        .await
    };
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token))
    }

    pub fn tasks_uri(&self) -> String {
        format!("/api/{}/tasks", self.id)
    }
}

/// Registers an account and resolves its id through `/api/auth/me`.
pub async fn register_user<S, B>(app: &S, email: &str) -> TestUser
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "email": email, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201, "registration of {} failed", email);
    let body: Value = test::read_body_json(resp).await;
    let token = body["data"]["access_token"]
        .as_str()
        .expect("token in registration response")
        .to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let me: Value = test::call_and_read_body_json(app, req).await;
    let id = me["data"]["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("user id in /me response");

    TestUser {
        id,
        email: email.to_string(),
        token,
    }
}

/// Creates a task and returns its JSON representation.
pub async fn create_task<S, B>(app: &S, user: &TestUser, payload: Value) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri(&user.tasks_uri())
        .insert_header(user.bearer())
        .set_json(payload)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    body["data"].clone()
}

/// Asserts the standard error envelope with the given code.
pub fn assert_error(body: &Value, code: &str) {
    assert_eq!(body["success"], false, "body: {}", body);
    assert!(body["data"].is_null(), "body: {}", body);
    assert_eq!(body["error"]["code"], code, "body: {}", body);
}
