//! Read-through cache with a lease-guarded miss path.
//!
//! On a miss exactly one caller per key wins the lease and is expected to
//! load, store, and release. Everyone else polls until the lease is gone and
//! then reads the fresh value, or takes the lease themselves if the winner
//! stored nothing.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::backend::CacheBackend;
use crate::error::CacheError;
use crate::locker::{Lease, Locker};

/// Sentinel stored to remember that a key has no backing record.
pub const NIL_VALUE: &str = "NIL";

#[derive(Debug, Clone)]
pub struct KeeperSettings {
    pub wait_budget: Duration,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub nil_ttl: Duration,
}

impl Default for KeeperSettings {
    fn default() -> Self {
        Self {
            wait_budget: Duration::from_secs(15),
            min_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(200),
            nil_ttl: Duration::from_secs(60),
        }
    }
}

/// Plain lookup outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cached {
    Hit(String),
    /// The key holds the NIL sentinel.
    Nil,
    Miss,
}

/// Outcome of [`CacheKeeper::get_or_lock`].
#[derive(Debug)]
pub enum CacheLookup {
    Hit(String),
    Nil,
    /// Caller owns the lease and must populate the key, then release.
    Leased(Lease),
}

#[derive(Clone)]
pub struct CacheKeeper {
    backend: Arc<dyn CacheBackend>,
    locker: Locker,
    settings: KeeperSettings,
}

impl CacheKeeper {
    pub fn new(backend: Arc<dyn CacheBackend>, locker: Locker) -> Self {
        Self {
            backend,
            locker,
            settings: KeeperSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: KeeperSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn locker(&self) -> &Locker {
        &self.locker
    }

    pub async fn get(&self, key: &str) -> Result<Cached, CacheError> {
        Ok(match self.backend.get(key).await? {
            None => Cached::Miss,
            Some(v) if v == NIL_VALUE => Cached::Nil,
            Some(v) => Cached::Hit(v),
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key).await? {
            Cached::Hit(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Cached::Nil | Cached::Miss => Ok(None),
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.backend.set(key, value, ttl).await
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, &raw, ttl).await
    }

    /// Store the NIL sentinel, with the configured default TTL unless given.
    pub async fn set_nil(&self, key: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let ttl = ttl.unwrap_or(self.settings.nil_ttl);
        self.backend.set(key, NIL_VALUE, ttl).await
    }

    pub async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.backend.del(key).await
    }

    /// Claim the write lease for `key` without touching the cached value.
    pub async fn acquire_lock(&self, key: &str) -> Result<Lease, CacheError> {
        self.locker.try_acquire(key).await
    }

    pub async fn get_or_lock(&self, key: &str) -> Result<CacheLookup, CacheError> {
        match self.get(key).await? {
            Cached::Hit(v) => return Ok(CacheLookup::Hit(v)),
            Cached::Nil => return Ok(CacheLookup::Nil),
            Cached::Miss => {}
        }

        if let Some(lookup) = self.claim_or_reread(key).await? {
            return Ok(lookup);
        }

        let deadline = Instant::now() + self.settings.wait_budget;
        let mut attempt: u32 = 0;

        loop {
            if Instant::now() >= deadline {
                return Err(CacheError::LockWaitTooLong { key: key.to_string() });
            }

            tokio::time::sleep(self.backoff(attempt)).await;
            attempt = attempt.saturating_add(1);

            match self.locker.is_held(key).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, key, "failed to check lease, retrying");
                    continue;
                }
            }

            match self.get(key).await? {
                Cached::Hit(v) => return Ok(CacheLookup::Hit(v)),
                Cached::Nil => return Ok(CacheLookup::Nil),
                Cached::Miss => {}
            }

            if let Some(lookup) = self.claim_or_reread(key).await? {
                return Ok(lookup);
            }
            tracing::debug!(key, "lease still contended, retrying");
        }
    }

    /// Take the lease and re-check the cache under it. `None` when someone
    /// else holds the lease.
    async fn claim_or_reread(&self, key: &str) -> Result<Option<CacheLookup>, CacheError> {
        let lease = match self.locker.try_acquire(key).await {
            Ok(lease) => lease,
            Err(CacheError::LockNotAcquired { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let cached = match self.get(key).await {
            Ok(cached) => cached,
            Err(e) => {
                lease.release().await?;
                return Err(e);
            }
        };

        match cached {
            Cached::Miss => Ok(Some(CacheLookup::Leased(lease))),
            Cached::Hit(v) => {
                lease.release().await?;
                Ok(Some(CacheLookup::Hit(v)))
            }
            Cached::Nil => {
                lease.release().await?;
                Ok(Some(CacheLookup::Nil))
            }
        }
    }

    /// Exponential backoff between min and max with full jitter on top of min.
    fn backoff(&self, attempt: u32) -> Duration {
        let min = self.settings.min_backoff;
        let max = self.settings.max_backoff.max(min);
        let ceiling = min.saturating_mul(1u32 << attempt.min(16)).min(max);
        if ceiling <= min {
            return min;
        }
        let spread = (ceiling - min).as_millis() as u64;
        min + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }
}
