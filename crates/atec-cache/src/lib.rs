//! atec-cache
//!
//! Shared key/value cache with thundering-herd-safe read-through, a
//! distributed lease for cross-process mutual exclusion, and a fixed-window
//! rate limiter. Redis in production, an in-process map for tests.

pub mod backend;
pub mod error;
pub mod keeper;
pub mod locker;
pub mod memory;
pub mod rate_limit;
pub mod redis;

pub use error::CacheError;
pub use keeper::{CacheKeeper, CacheLookup, Cached, KeeperSettings};
pub use locker::{Lease, Locker};
pub use rate_limit::{RateDecision, RateLimit, RateLimiter};
