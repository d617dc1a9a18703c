use std::time::Duration;

pub use atec_core::BoxFuture;

use crate::error::CacheError;

/// Raw string storage with per-key expiry.
pub trait CacheBackend: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CacheError>>;

    fn set<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration) -> BoxFuture<'a, Result<(), CacheError>>;

    fn del<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>>;

    /// Increment a counter that expires `window` after its first increment.
    /// Returns the new count and the time left in the window.
    fn incr_window<'a>(&'a self, key: &'a str, window: Duration) -> BoxFuture<'a, Result<(u64, Duration), CacheError>>;
}

/// Token-guarded exclusive claims.
pub trait LockBackend: Send + Sync {
    /// Set `key` to `token` only when absent. `true` when claimed.
    fn try_claim<'a>(&'a self, key: &'a str, token: &'a str, expiry: Duration) -> BoxFuture<'a, Result<bool, CacheError>>;

    /// Delete `key` only while it still holds `token`. `true` when deleted.
    fn release<'a>(&'a self, key: &'a str, token: &'a str) -> BoxFuture<'a, Result<bool, CacheError>>;

    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, CacheError>>;
}
