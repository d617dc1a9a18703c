use atec_core::models::child::Child;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use super::rows::{CHILD_COLUMNS, ChildRow, collect, naive_date};
use crate::error::StorageError;
use crate::repository::{BoxFuture, ChildFilter, ChildPatch, ChildRepository, NewChild, Tx};

impl ChildRepository for PgStore {
    fn create<'a>(&'a self, input: NewChild, tx: Tx<'a>) -> BoxFuture<'a, Result<Child, StorageError>> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO children (parent_user_id, date_of_birth, gender, name, guardian_name) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {CHILD_COLUMNS}"
            );
            let query = sqlx::query_as::<_, ChildRow>(&sql)
                .bind(input.parent_user_id)
                .bind(naive_date(input.date_of_birth)?)
                .bind(input.gender)
                .bind(input.name)
                .bind(input.guardian_name);
            let row = super::fetch_one_in!(query, &self.pool, tx);
            Child::try_from(row)
        })
    }

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<Child, StorageError>> {
        Box::pin(async move {
            let sql =
                format!("SELECT {CHILD_COLUMNS} FROM children WHERE id = $1 AND deleted_at IS NULL");
            let row = sqlx::query_as::<_, ChildRow>(&sql)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            Child::try_from(row)
        })
    }

    fn search(&self, filter: ChildFilter) -> BoxFuture<'_, Result<Vec<Child>, StorageError>> {
        Box::pin(async move {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "SELECT {CHILD_COLUMNS} FROM children WHERE deleted_at IS NULL"
            ));
            if let Some(parent) = filter.parent_user_id {
                qb.push(" AND parent_user_id = ").push_bind(parent);
            }
            if let Some(name) = filter.name {
                qb.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
            }
            if let Some(gender) = filter.gender {
                qb.push(" AND gender = ").push_bind(gender);
            }
            qb.push(" ORDER BY created_at ASC LIMIT ")
                .push_bind(filter.limit)
                .push(" OFFSET ")
                .push_bind(filter.offset);

            let rows = qb.build_query_as::<ChildRow>().fetch_all(&self.pool).await?;
            collect(rows)
        })
    }

    fn update<'a>(&'a self, id: Uuid, patch: ChildPatch, tx: Tx<'a>) -> BoxFuture<'a, Result<Child, StorageError>> {
        Box::pin(async move {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE children SET updated_at = now()");
            if let Some(dob) = patch.date_of_birth {
                qb.push(", date_of_birth = ").push_bind(naive_date(dob)?);
            }
            if let Some(gender) = patch.gender {
                qb.push(", gender = ").push_bind(gender);
            }
            if let Some(name) = patch.name {
                qb.push(", name = ").push_bind(name);
            }
            if let Some(guardian) = patch.guardian_name {
                qb.push(", guardian_name = ").push_bind(guardian);
            }
            qb.push(" WHERE deleted_at IS NULL AND id = ").push_bind(id);
            qb.push(format!(" RETURNING {CHILD_COLUMNS}"));

            let query = qb.build_query_as::<ChildRow>();
            let row = super::fetch_one_in!(query, &self.pool, tx);
            Child::try_from(row)
        })
    }
}
