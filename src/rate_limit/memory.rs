use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{RateLimitBackend, RateLimitError};
use crate::clock::Clock;

/// Expired entries are swept once the map grows past this many keys.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u64,
    reset_at: Duration,
}

/// Counters held in this process. Not shared between instances.
pub struct InMemoryBackend {
    counters: Mutex<HashMap<String, CounterEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Count recorded for `key` in its current window, if any.
    pub fn current_count(&self, key: &str) -> Option<u64> {
        let now = self.clock.now();
        let counters = self.counters.lock().ok()?;
        counters
            .get(key)
            .filter(|entry| now <= entry.reset_at)
            .map(|entry| entry.count)
    }

    fn bump(&self, key: &str, window: Duration) -> Result<u64, RateLimitError> {
        let now = self.clock.now();
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| RateLimitError::Unavailable("counter lock poisoned".into()))?;

        if counters.len() > PRUNE_THRESHOLD {
            counters.retain(|_, entry| now <= entry.reset_at);
        }

        let entry = counters
            .entry(key.to_string())
            .and_modify(|entry| {
                if now > entry.reset_at {
                    entry.count = 1;
                    entry.reset_at = now + window;
                } else {
                    entry.count += 1;
                }
            })
            .or_insert(CounterEntry {
                count: 1,
                reset_at: now + window,
            });

        Ok(entry.count)
    }
}

#[async_trait]
impl RateLimitBackend for InMemoryBackend {
    async fn increment(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RateLimitError> {
        let count = self.bump(key, Duration::from_secs(window_seconds))?;
        Ok(count <= limit)
    }
}
