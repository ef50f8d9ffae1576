use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::RedisError;
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::{RateLimitBackend, RateLimitError};

/// Counters shared through Redis, so every instance sees the same counts.
///
/// Each increment is `INCR`, followed by `EXPIRE` when the key was just created. Connect and
/// command round trips are bounded by their own timeouts. Any failure drops the cached
/// connection so the next request reconnects.
pub struct RedisBackend {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RedisBackend {
    /// Validates the URL. No connection is opened until the first increment.
    pub fn new(
        redis_url: &str,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self, RedisError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
            connection: Mutex::new(None),
            connect_timeout,
            command_timeout,
        })
    }

    /// The lock guards only the cached handle and is never held across a connect.
    async fn connection(&self) -> Result<MultiplexedConnection, RateLimitError> {
        let cached = self.connection.lock().await.clone();
        if let Some(connection) = cached {
            return Ok(connection);
        }

        let connection = timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| RateLimitError::Timeout("connect"))??;

        Ok(self
            .connection
            .lock()
            .await
            .get_or_insert(connection)
            .clone())
    }

    async fn reset(&self) {
        *self.connection.lock().await = None;
    }
}

#[async_trait]
impl RateLimitBackend for RedisBackend {
    async fn increment(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RateLimitError> {
        let mut connection = self.connection().await?;

        let round_trip = async {
            let count: u64 = redis::cmd("INCR")
                .arg(key)
                .query_async(&mut connection)
                .await?;
            if count == 1 {
                let _: () = redis::cmd("EXPIRE")
                    .arg(key)
                    .arg(window_seconds)
                    .query_async(&mut connection)
                    .await?;
            }
            Ok::<u64, RedisError>(count)
        };

        match timeout(self.command_timeout, round_trip).await {
            Ok(Ok(count)) => Ok(count <= limit),
            Ok(Err(e)) => {
                self.reset().await;
                Err(e.into())
            }
            Err(_) => {
                self.reset().await;
                Err(RateLimitError::Timeout("command"))
            }
        }
    }
}
