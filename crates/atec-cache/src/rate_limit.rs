use std::sync::Arc;
use std::time::Duration;

use crate::backend::CacheBackend;
use crate::error::CacheError;

/// At most `max` hits per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max: u64,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Time until the current window resets.
    pub retry_after: Duration,
}

/// Fixed-window counter shared through the cache backend.
#[derive(Clone)]
pub struct RateLimiter {
    backend: Arc<dyn CacheBackend>,
}

impl RateLimiter {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub async fn allow(&self, key: &str, limit: RateLimit) -> Result<RateDecision, CacheError> {
        let (count, remaining) = self.backend.incr_window(key, limit.window).await?;
        let allowed = count <= limit.max;
        if !allowed {
            tracing::debug!(key, count, max = limit.max, "rate limit exceeded");
        }
        Ok(RateDecision {
            allowed,
            retry_after: remaining,
        })
    }
}
