//! atec-core
//!
//! Pure domain types, the request principal, the use-case error type, and
//! cache key conventions. No database or network dependency. This is the
//! shared vocabulary of the ATEC service.

pub mod cache_keys;
pub mod error;
pub mod models;
pub mod principal;

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by the async trait seams of the workspace.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
