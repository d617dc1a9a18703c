use atec_core::models::package::Package;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use super::rows::{PACKAGE_COLUMNS, PackageRow, collect};
use crate::error::StorageError;
use crate::repository::{
    BoxFuture, NewPackage, PackageFilter, PackagePatch, PackageRepository, Tx,
};

impl PackageRepository for PgStore {
    fn create<'a>(&'a self, input: NewPackage, tx: Tx<'a>) -> BoxFuture<'a, Result<Package, StorageError>> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO packages (created_by, name, questionnaire, indication_categories, \
                 image_result_attribute_key, is_active) VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING {PACKAGE_COLUMNS}"
            );
            let content = input.content;
            let query = sqlx::query_as::<_, PackageRow>(&sql)
                .bind(input.created_by)
                .bind(content.name)
                .bind(Json(content.questionnaire))
                .bind(Json(content.indication_categories))
                .bind(Json(content.image_result_attribute_key))
                .bind(input.is_active);
            let row = super::fetch_one_in!(query, &self.pool, tx);
            Package::try_from(row)
        })
    }

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<Package, StorageError>> {
        Box::pin(async move {
            let sql =
                format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = $1 AND deleted_at IS NULL");
            let row = sqlx::query_as::<_, PackageRow>(&sql)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            Package::try_from(row)
        })
    }

    fn search(&self, filter: PackageFilter) -> BoxFuture<'_, Result<Vec<Package>, StorageError>> {
        Box::pin(async move {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "SELECT {PACKAGE_COLUMNS} FROM packages WHERE deleted_at IS NULL"
            ));
            if let Some(active) = filter.is_active {
                qb.push(" AND is_active = ").push_bind(active);
            }
            if let Some(locked) = filter.is_locked {
                qb.push(" AND is_locked = ").push_bind(locked);
            }
            qb.push(" ORDER BY created_at ASC LIMIT ")
                .push_bind(filter.limit)
                .push(" OFFSET ")
                .push_bind(filter.offset);

            let rows = qb.build_query_as::<PackageRow>().fetch_all(&self.pool).await?;
            collect(rows)
        })
    }

    fn find_oldest_active_and_locked(&self) -> BoxFuture<'_, Result<Package, StorageError>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {PACKAGE_COLUMNS} FROM packages \
                 WHERE is_active AND is_locked AND deleted_at IS NULL \
                 ORDER BY created_at ASC LIMIT 1"
            );
            let row = sqlx::query_as::<_, PackageRow>(&sql)
                .fetch_one(&self.pool)
                .await?;
            Package::try_from(row)
        })
    }

    fn update<'a>(&'a self, id: Uuid, patch: PackagePatch, tx: Tx<'a>) -> BoxFuture<'a, Result<Package, StorageError>> {
        Box::pin(async move {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE packages SET updated_at = now()");
            if let Some(content) = patch.content {
                qb.push(", name = ").push_bind(content.name);
                qb.push(", questionnaire = ").push_bind(Json(content.questionnaire));
                qb.push(", indication_categories = ")
                    .push_bind(Json(content.indication_categories));
                qb.push(", image_result_attribute_key = ")
                    .push_bind(Json(content.image_result_attribute_key));
            }
            if let Some(active) = patch.is_active {
                qb.push(", is_active = ").push_bind(active);
            }
            qb.push(" WHERE deleted_at IS NULL AND id = ").push_bind(id);
            qb.push(format!(" RETURNING {PACKAGE_COLUMNS}"));

            let query = qb.build_query_as::<PackageRow>();
            let row = super::fetch_one_in!(query, &self.pool, tx);
            Package::try_from(row)
        })
    }

    fn mark_locked(&self, id: Uuid) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            let done = sqlx::query(
                "UPDATE packages SET is_locked = true, updated_at = now() \
                 WHERE id = $1 AND deleted_at IS NULL AND NOT is_locked",
            )
            .bind(id)
            .execute(&self.pool)
            .await?;

            if done.rows_affected() == 0 {
                // Already locked is success; a missing row is not.
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM packages WHERE id = $1 AND deleted_at IS NULL)",
                )
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
                if !exists {
                    return Err(StorageError::NotFound);
                }
            }
            Ok(())
        })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            let done = sqlx::query(
                "UPDATE packages SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
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
