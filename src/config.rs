use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// Cookie attributes for the `access_token` session cookie.
#[derive(Debug, Clone, Default)]
pub struct CookieSettings {
    pub secure: bool,
    pub domain: Option<String>,
}

/// Rate limiter settings.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub authenticated_limit: u64,
    pub unauthenticated_limit: u64,
    pub window_seconds: u64,
    /// Allow requests through when the counter backend is unreachable.
    pub fail_open: bool,
    /// Selects the Redis backend when set; otherwise counters live in process memory.
    pub redis_url: Option<String>,
    pub connect_timeout: Duration,
    pub socket_timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            authenticated_limit: 1000,
            unauthenticated_limit: 100,
            window_seconds: 3600,
            fail_open: true,
            redis_url: None,
            connect_timeout: Duration::from_millis(200),
            socket_timeout: Duration::from_millis(200),
        }
    }
}

pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Postgres connection string. When absent the process-local store is used.
    pub database_url: Option<String>,
    pub cors_origin: String,
    pub jwt_secret: String,
    pub token_lifetime_seconds: i64,
    pub bcrypt_cost: u32,
    pub cookie: CookieSettings,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Call `dotenv::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let jwt_secret = get("JWT_SECRET")
            .ok_or_else(|| AppError::ConfigError("JWT_SECRET must be set".into()))?;

        let defaults = RateLimitConfig::default();
        let window_seconds = parse_or(&get, "RATE_LIMIT_WINDOW_SECONDS", defaults.window_seconds)?;
        if window_seconds == 0 {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_WINDOW_SECONDS must be greater than zero".into(),
            ));
        }

        let rate_limit = RateLimitConfig {
            authenticated_limit: parse_or(
                &get,
                "RATE_LIMIT_AUTHENTICATED",
                defaults.authenticated_limit,
            )?,
            unauthenticated_limit: parse_or(
                &get,
                "RATE_LIMIT_UNAUTHENTICATED",
                defaults.unauthenticated_limit,
            )?,
            window_seconds,
            fail_open: get("RATE_LIMIT_FAIL_OPEN")
                .map(|value| parse_flag(&value))
                .unwrap_or(defaults.fail_open),
            redis_url: get("REDIS_URL"),
            connect_timeout: Duration::from_millis(parse_or(
                &get,
                "RATE_LIMIT_REDIS_CONNECT_TIMEOUT_MS",
                200u64,
            )?),
            socket_timeout: Duration::from_millis(parse_or(
                &get,
                "RATE_LIMIT_REDIS_SOCKET_TIMEOUT_MS",
                200u64,
            )?),
        };

        let token_lifetime_seconds: i64 = parse_or(&get, "ACCESS_TOKEN_EXPIRE_SECONDS", 86_400)?;
        if token_lifetime_seconds <= 0 {
            return Err(AppError::ConfigError(
                "ACCESS_TOKEN_EXPIRE_SECONDS must be positive".into(),
            ));
        }

        let bcrypt_cost: u32 = parse_or(&get, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(AppError::ConfigError(format!(
                "BCRYPT_COST must be between 4 and 31, got {}",
                bcrypt_cost
            )));
        }

        Ok(Self {
            server_host: get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: parse_or(&get, "SERVER_PORT", 8080)?,
            database_url: get("DATABASE_URL"),
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string()),
            jwt_secret,
            token_lifetime_seconds,
            bcrypt_cost,
            cookie: CookieSettings {
                secure: get("COOKIE_SECURE")
                    .map(|value| parse_flag(&value))
                    .unwrap_or(false),
                domain: get("COOKIE_DOMAIN"),
            },
            rate_limit,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::ConfigError(format!("{} must be a number, got {:?}", key, raw))),
        None => Ok(default),
    }
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
