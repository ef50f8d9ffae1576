//! Fixed-window request rate limiting.
//!
//! Every request is counted against one key per window. Callers with a valid session token
//! are counted per user; everyone else (and every login or registration attempt) is counted
//! per client IP. Counters live behind [`RateLimitBackend`], either in process memory or in
//! Redis. When the backend cannot answer, the configured outage policy decides between
//! letting the request through and rejecting it with `503`.

pub mod memory;
pub mod middleware;
pub mod redis_backend;

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::TokenCodec;
use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::AppError;

pub use memory::InMemoryBackend;
pub use middleware::RateLimitMiddleware;
pub use redis_backend::RedisBackend;

/// Paths always limited per IP, even when a valid token is presented.
pub const ANONYMOUS_SENSITIVE_PATHS: [&str; 2] = ["/api/auth/login", "/api/auth/register"];

#[derive(Debug)]
pub enum RateLimitError {
    /// The backend answered with an error.
    Backend(String),
    /// Connecting or running a command took longer than allowed.
    Timeout(&'static str),
    /// The backend could not be used at all, e.g. a poisoned lock.
    Unavailable(String),
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RateLimitError::Backend(detail) => write!(f, "rate limit backend error: {}", detail),
            RateLimitError::Timeout(stage) => write!(f, "rate limit backend timed out during {}", stage),
            RateLimitError::Unavailable(detail) => {
                write!(f, "rate limit backend unavailable: {}", detail)
            }
        }
    }
}

impl std::error::Error for RateLimitError {}

impl From<redis::RedisError> for RateLimitError {
    fn from(error: redis::RedisError) -> Self {
        RateLimitError::Backend(error.to_string())
    }
}

/// A counter store. Implementations must make each increment atomic per key.
#[async_trait]
pub trait RateLimitBackend: Send + Sync {
    /// Adds one to `key` and reports whether the new count is still within `limit`.
    ///
    /// The first increment of a key starts a window of `window_seconds`; once it has elapsed
    /// the next increment starts counting from one again.
    async fn increment(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RateLimitError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub authenticated_limit: u64,
    pub unauthenticated_limit: u64,
    pub window_seconds: u64,
    pub fail_open: bool,
}

impl From<&RateLimitConfig> for RateLimitPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            authenticated_limit: config.authenticated_limit,
            unauthenticated_limit: config.unauthenticated_limit,
            window_seconds: config.window_seconds.max(1),
            fail_open: config.fail_open,
        }
    }
}

/// The counter a request is charged to and the limit that applies to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitKey {
    pub key: String,
    pub limit: u64,
}

pub struct RateLimiter {
    backend: Arc<dyn RateLimitBackend>,
    codec: Arc<TokenCodec>,
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(
        backend: Arc<dyn RateLimitBackend>,
        codec: Arc<TokenCodec>,
        policy: RateLimitPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            codec,
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    fn window_index(&self) -> u64 {
        self.clock.now().as_secs() / self.policy.window_seconds
    }

    /// Picks the counter for a request.
    ///
    /// A token that fails verification is treated as no token at all; rejecting it is the
    /// session guard's job, not the limiter's.
    pub fn derive_key(&self, token: Option<&str>, path: &str, client_ip: Option<IpAddr>) -> RateLimitKey {
        let window = self.window_index();

        if !ANONYMOUS_SENSITIVE_PATHS.contains(&path) {
            if let Some(claims) = token.and_then(|t| self.codec.verify(t).ok()) {
                return RateLimitKey {
                    key: format!("rate:user:{}:{}", claims.subject_id, window),
                    limit: self.policy.authenticated_limit,
                };
            }
        }

        let ip = client_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        RateLimitKey {
            key: format!("rate:ip:{}:{}", ip, window),
            limit: self.policy.unauthenticated_limit,
        }
    }

    /// Charges the request to its counter.
    ///
    /// Returns `RateLimited` once the limit is exceeded. Backend failures become `Ok(())`
    /// under a fail-open policy and `ServiceUnavailable` otherwise.
    pub async fn check(
        &self,
        token: Option<&str>,
        path: &str,
        client_ip: Option<IpAddr>,
    ) -> Result<(), AppError> {
        let RateLimitKey { key, limit } = self.derive_key(token, path, client_ip);

        match self
            .backend
            .increment(&key, limit, self.policy.window_seconds)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                log::info!("rate limit exceeded for {}", key);
                Err(AppError::RateLimited)
            }
            Err(e) => {
                log::warn!(
                    "{} (key {}, fail_open={})",
                    e,
                    key,
                    self.policy.fail_open
                );
                if self.policy.fail_open {
                    Ok(())
                } else {
                    Err(AppError::ServiceUnavailable)
                }
            }
        }
    }
}

/// Chooses the counter backend: Redis when a URL is configured, process memory otherwise.
pub fn build_backend(
    config: &RateLimitConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn RateLimitBackend>, AppError> {
    match &config.redis_url {
        Some(url) => {
            let backend = RedisBackend::new(url, config.connect_timeout, config.socket_timeout)
                .map_err(|e| AppError::ConfigError(format!("invalid REDIS_URL: {}", e)))?;
            log::info!("rate limiter using Redis backend");
            Ok(Arc::new(backend))
        }
        None => {
            log::info!("rate limiter using in-memory backend");
            Ok(Arc::new(InMemoryBackend::new(clock)))
        }
    }
}
