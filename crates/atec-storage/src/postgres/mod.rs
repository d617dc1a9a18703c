//! PostgreSQL backend.

/// Run `fetch_one` on the transaction when given, else on the pool.
macro_rules! fetch_one_in {
    ($query:expr, $pool:expr, $tx:expr) => {
        match $tx {
            Some(tx) => {
                let conn = $crate::postgres::pg_tx(tx)?;
                $query.fetch_one(&mut **conn).await?
            }
            None => $query.fetch_one($pool).await?,
        }
    };
}
pub(crate) use fetch_one_in;

mod children;
mod packages;
mod results;
mod rows;
mod users;

use std::any::Any;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres};

use crate::error::StorageError;
use crate::repository::{BoxFuture, Transaction, TxFactory};

/// Pool sizing and per-statement limits.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 50,
            min_connections: 5,
            max_lifetime: Duration::from_secs(30 * 60),
            acquire_timeout: Duration::from_secs(10),
            statement_timeout: Duration::from_secs(15),
        }
    }
}

/// All four repositories over one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(dsn: &str, settings: &PoolSettings) -> Result<Self, StorageError> {
        let options: PgConnectOptions = dsn
            .parse()
            .map_err(|e: sqlx::Error| StorageError::Internal(format!("invalid dsn: {e}")))?;
        let options = options.options([(
            "statement_timeout",
            settings.statement_timeout.as_millis().to_string(),
        )]);

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .max_lifetime(settings.max_lifetime)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await?;

        tracing::info!(
            max_connections = settings.max_connections,
            min_connections = settings.min_connections,
            "connected to postgres"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub struct PgTransaction {
    inner: sqlx::Transaction<'static, Postgres>,
}

impl Transaction for PgTransaction {
    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StorageError>> {
        Box::pin(async move { self.inner.commit().await.map_err(StorageError::from) })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<(), StorageError>> {
        Box::pin(async move { self.inner.rollback().await.map_err(StorageError::from) })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TxFactory for PgStore {
    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn Transaction>, StorageError>> {
        Box::pin(async move {
            let inner = self.pool.begin().await?;
            Ok(Box::new(PgTransaction { inner }) as Box<dyn Transaction>)
        })
    }
}

/// The sqlx transaction behind a handle, or an error when the handle came
/// from another backend.
fn pg_tx<'a>(tx: &'a mut dyn Transaction) -> Result<&'a mut sqlx::Transaction<'static, Postgres>, StorageError> {
    tx.as_any_mut()
        .downcast_mut::<PgTransaction>()
        .map(|t| &mut t.inner)
        .ok_or_else(|| StorageError::Internal("transaction handle belongs to another backend".to_string()))
}

