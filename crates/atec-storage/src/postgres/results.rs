use atec_core::models::result::QuestionnaireResult;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use super::rows::{RESULT_COLUMNS, ResultRow, collect};
use crate::error::StorageError;
use crate::repository::{BoxFuture, NewResult, ResultFilter, ResultRepository, Tx};

impl ResultRepository for PgStore {
    fn create<'a>(&'a self, input: NewResult, tx: Tx<'a>) -> BoxFuture<'a, Result<QuestionnaireResult, StorageError>> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO results (package_id, child_id, created_by, answer, result) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {RESULT_COLUMNS}"
            );
            let query = sqlx::query_as::<_, ResultRow>(&sql)
                .bind(input.package_id)
                .bind(input.child_id)
                .bind(input.created_by)
                .bind(Json(input.answer))
                .bind(Json(input.result));
            let row = super::fetch_one_in!(query, &self.pool, tx);
            QuestionnaireResult::try_from(row)
        })
    }

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<QuestionnaireResult, StorageError>> {
        Box::pin(async move {
            let sql =
                format!("SELECT {RESULT_COLUMNS} FROM results WHERE id = $1 AND deleted_at IS NULL");
            let row = sqlx::query_as::<_, ResultRow>(&sql)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            QuestionnaireResult::try_from(row)
        })
    }

    fn search(&self, filter: ResultFilter) -> BoxFuture<'_, Result<Vec<QuestionnaireResult>, StorageError>> {
        Box::pin(async move {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "SELECT {RESULT_COLUMNS} FROM results WHERE deleted_at IS NULL"
            ));
            if let Some(id) = filter.id {
                qb.push(" AND id = ").push_bind(id);
            }
            if let Some(package_id) = filter.package_id {
                qb.push(" AND package_id = ").push_bind(package_id);
            }
            if let Some(child_id) = filter.child_id {
                qb.push(" AND child_id = ").push_bind(child_id);
            }
            if let Some(created_by) = filter.created_by {
                qb.push(" AND created_by = ").push_bind(created_by);
            }
            qb.push(" ORDER BY created_at ASC LIMIT ")
                .push_bind(filter.limit)
                .push(" OFFSET ")
                .push_bind(filter.offset);

            let rows = qb.build_query_as::<ResultRow>().fetch_all(&self.pool).await?;
            collect(rows)
        })
    }

    fn find_user_history(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> BoxFuture<'_, Result<Vec<QuestionnaireResult>, StorageError>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {RESULT_COLUMNS} FROM results WHERE deleted_at IS NULL AND \
                 (created_by = $1 OR child_id IN \
                   (SELECT id FROM children WHERE parent_user_id = $1 AND deleted_at IS NULL)) \
                 ORDER BY created_at ASC LIMIT $2 OFFSET $3"
            );
            let rows = sqlx::query_as::<_, ResultRow>(&sql)
                .bind(user_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
            collect(rows)
        })
    }
}
