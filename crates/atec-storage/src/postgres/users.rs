use atec_core::models::user::{Role, User};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use super::rows::{USER_COLUMNS, UserRow, collect};
use crate::error::StorageError;
use crate::repository::{BoxFuture, NewUser, Tx, UserPatch, UserRepository};

impl UserRepository for PgStore {
    fn create<'a>(&'a self, input: NewUser, tx: Tx<'a>) -> BoxFuture<'a, Result<User, StorageError>> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO users (email, password, username, is_active, role) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
            );
            let query = sqlx::query_as::<_, UserRow>(&sql)
                .bind(input.email)
                .bind(input.password)
                .bind(input.username)
                .bind(input.is_active)
                .bind(input.role.as_str());
            let row = super::fetch_one_in!(query, &self.pool, tx);
            User::try_from(row)
        })
    }

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<User, StorageError>> {
        Box::pin(async move {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
            let row = sqlx::query_as::<_, UserRow>(&sql)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            User::try_from(row)
        })
    }

    fn find_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<User, StorageError>> {
        Box::pin(async move {
            let sql =
                format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
            let row = sqlx::query_as::<_, UserRow>(&sql)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
            User::try_from(row)
        })
    }

    fn find_by_role(&self, role: Role, limit: i64, offset: i64) -> BoxFuture<'_, Result<Vec<User>, StorageError>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE role = $1 AND deleted_at IS NULL \
                 ORDER BY created_at ASC LIMIT $2 OFFSET $3"
            );
            let rows = sqlx::query_as::<_, UserRow>(&sql)
                .bind(role.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
            collect(rows)
        })
    }

    fn update<'a>(&'a self, id: Uuid, patch: UserPatch, tx: Tx<'a>) -> BoxFuture<'a, Result<User, StorageError>> {
        Box::pin(async move {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET updated_at = now()");
            if let Some(username) = patch.username {
                qb.push(", username = ").push_bind(username);
            }
            if let Some(password) = patch.password {
                qb.push(", password = ").push_bind(password);
            }
            if let Some(is_active) = patch.is_active {
                qb.push(", is_active = ").push_bind(is_active);
            }
            if let Some(phone) = patch.phone_number {
                qb.push(", phone_number = ").push_bind(phone);
            }
            if let Some(address) = patch.address {
                qb.push(", address = ").push_bind(address);
            }
            qb.push(" WHERE deleted_at IS NULL AND id = ").push_bind(id);
            qb.push(format!(" RETURNING {USER_COLUMNS}"));

            let query = qb.build_query_as::<UserRow>();
            let row = super::fetch_one_in!(query, &self.pool, tx);
            User::try_from(row)
        })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            let done = sqlx::query(
                "UPDATE users SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
            if done.rows_affected() == 0 {
                return Err(StorageError::NotFound);
            }
            Ok(())
        })
    }
}
