//! Distributed leases.
//!
//! A lease is `SET lock:<key> <token> NX PX <expiry>`. Release compares the
//! token before deleting, so a holder whose lease expired cannot free a lease
//! someone else took over. Expiry bounds how long a crashed holder blocks.

use std::sync::Arc;
use std::time::Duration;

use atec_core::cache_keys;
use uuid::Uuid;

use crate::backend::LockBackend;
use crate::error::CacheError;

pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(10);
const RETRY_DELAY: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct Locker {
    backend: Arc<dyn LockBackend>,
    expiry: Duration,
}

impl Locker {
    pub fn new(backend: Arc<dyn LockBackend>) -> Self {
        Self {
            backend,
            expiry: DEFAULT_EXPIRY,
        }
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    /// Single attempt with the default expiry.
    pub async fn try_acquire(&self, key: &str) -> Result<Lease, CacheError> {
        self.acquire(key, self.expiry, 1).await
    }

    /// Claim the lease for `key`, trying up to `tries` times.
    pub async fn acquire(&self, key: &str, expiry: Duration, tries: u32) -> Result<Lease, CacheError> {
        let lock_key = cache_keys::lock(key);
        let token = Uuid::new_v4().to_string();

        for attempt in 0..tries.max(1) {
            if attempt > 0 {
                tokio::time::sleep(RETRY_DELAY).await;
            }
            if self.backend.try_claim(&lock_key, &token, expiry).await? {
                return Ok(Lease {
                    key: lock_key,
                    token,
                    backend: Arc::clone(&self.backend),
                });
            }
        }

        Err(CacheError::LockNotAcquired { key: key.to_string() })
    }

    /// Whether anyone currently holds the lease for `key`.
    pub async fn is_held(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.exists(&cache_keys::lock(key)).await
    }
}

/// A time-bounded exclusive claim. Dropping without [`Lease::release`]
/// leaves the claim in place until it expires.
#[must_use = "a lease should be released once the guarded write is done"]
pub struct Lease {
    key: String,
    token: String,
    backend: Arc<dyn LockBackend>,
}

impl Lease {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn release(self) -> Result<(), CacheError> {
        if !self.backend.release(&self.key, &self.token).await? {
            tracing::warn!(key = %self.key, "lease expired before release");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease").field("key", &self.key).finish_non_exhaustive()
    }
}
