//! atec-storage
//!
//! The persistence gateway. Repository traits with a small failure taxonomy,
//! a PostgreSQL implementation on sqlx, and an in-memory implementation for
//! tests and local runs.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use error::StorageError;
pub use repository::BoxFuture;
