//! In-process backend for tests and single-node runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::backend::{BoxFuture, CacheBackend, LockBackend};
use crate::error::CacheError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Expiry follows the tokio clock so paused-time tests can advance it.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| CacheError::Backend("memory backend poisoned".to_string()))?;
        let now = Instant::now();
        guard.retain(|_, e| e.expires_at > now);
        Ok(guard)
    }

    fn insert(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries()?.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

impl CacheBackend for MemoryBackend {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CacheError>> {
        Box::pin(async move { Ok(self.entries()?.get(key).map(|e| e.value.clone())) })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move { self.insert(key, value, ttl) })
    }

    fn del<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            self.entries()?.remove(key);
            Ok(())
        })
    }

    fn incr_window<'a>(&'a self, key: &'a str, window: Duration) -> BoxFuture<'a, Result<(u64, Duration), CacheError>> {
        Box::pin(async move {
            let mut entries = self.entries()?;
            let now = Instant::now();
            let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
                value: "0".to_string(),
                expires_at: now + window,
            });
            let count = entry.value.parse::<u64>().unwrap_or(0) + 1;
            entry.value = count.to_string();
            Ok((count, entry.expires_at.saturating_duration_since(now)))
        })
    }
}

impl LockBackend for MemoryBackend {
    fn try_claim<'a>(&'a self, key: &'a str, token: &'a str, expiry: Duration) -> BoxFuture<'a, Result<bool, CacheError>> {
        Box::pin(async move {
            let mut entries = self.entries()?;
            if entries.contains_key(key) {
                return Ok(false);
            }
            entries.insert(
                key.to_string(),
                Entry {
                    value: token.to_string(),
                    expires_at: Instant::now() + expiry,
                },
            );
            Ok(true)
        })
    }

    fn release<'a>(&'a self, key: &'a str, token: &'a str) -> BoxFuture<'a, Result<bool, CacheError>> {
        Box::pin(async move {
            let mut entries = self.entries()?;
            match entries.get(key) {
                Some(e) if e.value == token => {
                    entries.remove(key);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, CacheError>> {
        Box::pin(async move { Ok(self.entries()?.contains_key(key)) })
    }
}
