use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::TokenCodec;
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, CookieSettings};
use crate::error::AppError;
use crate::rate_limit::{build_backend, RateLimitPolicy, RateLimiter};
use crate::store::{MemoryStore, PgStore, TaskStore, UserStore};

/// Everything handlers and middleware share, built once at startup.
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub tokens: Arc<TokenCodec>,
    pub rate_limiter: Arc<RateLimiter>,
    pub cookies: CookieSettings,
    pub bcrypt_cost: u32,
    pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
        tokens: Arc<TokenCodec>,
        rate_limiter: Arc<RateLimiter>,
        cookies: CookieSettings,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users,
            tasks,
            tokens,
            rate_limiter,
            cookies,
            bcrypt_cost,
            pool: None,
        }
    }

    /// Wires stores, token codec and rate limiter from configuration.
    pub async fn build(config: &Config) -> Result<Self, AppError> {
        let tokens = Arc::new(TokenCodec::new(
            &config.jwt_secret,
            config.token_lifetime_seconds,
        ));

        let users: Arc<dyn UserStore>;
        let tasks: Arc<dyn TaskStore>;
        let mut pool = None;
        match &config.database_url {
            Some(url) => {
                let store = Arc::new(PgStore::connect(url).await?);
                log::info!("connected to PostgreSQL, migrations applied");
                pool = Some(store.pool().clone());
                users = store.clone();
                tasks = store;
            }
            None => {
                log::warn!("DATABASE_URL not set; data is kept in memory and lost on restart");
                let store = Arc::new(MemoryStore::new());
                users = store.clone();
                tasks = store;
            }
        }

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let backend = build_backend(&config.rate_limit, clock.clone())?;
        let rate_limiter = Arc::new(RateLimiter::new(
            backend,
            tokens.clone(),
            RateLimitPolicy::from(&config.rate_limit),
            clock,
        ));

        Ok(Self {
            users,
            tasks,
            tokens,
            rate_limiter,
            cookies: config.cookie.clone(),
            bcrypt_cost: config.bcrypt_cost,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            log::info!("database pool closed");
        }
    }
}
