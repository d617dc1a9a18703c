//! Child registration, lookup and score statistics.

use std::sync::Arc;

use atec_core::error::ServiceError;
use atec_core::models::child::Child;
use atec_core::models::result::{ResultDetail, total_score};
use atec_core::models::user::Role;
use atec_core::principal::Requester;
use atec_storage::StorageError;
use atec_storage::repository::{
    ChildFilter, ChildPatch, ChildRepository, NewChild, ResultFilter, ResultRepository, UserRepository,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::access::require_principal;
use crate::pagination::Page;

const STATISTIC_BATCH: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterChildInput {
    pub date_of_birth: jiff::civil::Date,
    #[serde(default)]
    pub gender: bool,
    pub name: String,
    #[serde(default)]
    pub guardian_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateChildInput {
    #[serde(default)]
    pub date_of_birth: Option<jiff::civil::Date>,
    #[serde(default)]
    pub gender: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub guardian_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChildSearch {
    #[serde(default)]
    pub parent_user_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<bool>,
}

/// A child as listed to its parent.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredChild {
    #[serde(flatten)]
    pub child: Child,
    pub parent_username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticComponent {
    pub total: i32,
    pub created_at: jiff::Timestamp,
    pub detail: ResultDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistic {
    pub statistic: Vec<StatisticComponent>,
}

#[derive(Clone)]
pub struct ChildService {
    children: Arc<dyn ChildRepository>,
    users: Arc<dyn UserRepository>,
    results: Arc<dyn ResultRepository>,
}

impl ChildService {
    pub fn new(
        children: Arc<dyn ChildRepository>,
        users: Arc<dyn UserRepository>,
        results: Arc<dyn ResultRepository>,
    ) -> Self {
        Self {
            children,
            users,
            results,
        }
    }

    /// Register a child with the caller as its parent.
    pub async fn register(&self, requester: &Requester, input: RegisterChildInput) -> Result<Uuid, ServiceError> {
        let principal = require_principal(requester, atec_core::error::MSG_UNAUTHORIZED)?;
        let name = non_empty_name(&input.name)?;

        let child = self
            .children
            .create(
                NewChild {
                    parent_user_id: principal.user_id,
                    date_of_birth: input.date_of_birth,
                    gender: input.gender,
                    name,
                    guardian_name: trimmed(input.guardian_name),
                },
                None,
            )
            .await?;

        info!(child_id = %child.id, parent_user_id = %principal.user_id, "child registered");
        Ok(child.id)
    }

    pub async fn update(&self, requester: &Requester, id: Uuid, input: UpdateChildInput) -> Result<(), ServiceError> {
        let principal = require_principal(requester, atec_core::error::MSG_UNAUTHORIZED)?;
        let name = input.name.as_deref().map(non_empty_name).transpose()?;

        let child = self.children.find_by_id(id).await?;
        if !principal.owns_child(&child) {
            return Err(ServiceError::Forbidden(
                "only the child's parent should be able to update child data".to_string(),
            ));
        }

        self.children
            .update(
                id,
                ChildPatch {
                    date_of_birth: input.date_of_birth,
                    gender: input.gender,
                    name,
                    guardian_name: trimmed(input.guardian_name),
                },
                None,
            )
            .await?;
        Ok(())
    }

    /// The caller's own children.
    pub async fn registered(&self, requester: &Requester, page: Page) -> Result<Vec<RegisteredChild>, ServiceError> {
        let principal = require_principal(requester, atec_core::error::MSG_UNAUTHORIZED)?;
        page.validate()?;

        let children = self
            .children
            .search(ChildFilter {
                parent_user_id: Some(principal.user_id),
                limit: page.limit,
                offset: page.offset,
                ..Default::default()
            })
            .await?;
        let parent = self.users.find_by_id(principal.user_id).await?;

        Ok(children
            .into_iter()
            .map(|child| RegisteredChild {
                child,
                parent_username: parent.username.clone(),
            })
            .collect())
    }

    /// Full search for staff.
    pub async fn search(&self, requester: &Requester, search: ChildSearch, page: Page) -> Result<Vec<Child>, ServiceError> {
        let principal = require_principal(requester, atec_core::error::MSG_UNAUTHORIZED)?;
        if !matches!(principal.role, Role::Admin | Role::Therapist) {
            return Err(ServiceError::Forbidden(
                "insufficient permission to access this feature".to_string(),
            ));
        }
        page.validate()?;

        Ok(self
            .children
            .search(ChildFilter {
                parent_user_id: search.parent_user_id,
                name: search.name.filter(|n| !n.trim().is_empty()),
                gender: search.gender,
                limit: page.limit,
                offset: page.offset,
            })
            .await?)
    }

    /// Every result recorded for the child, oldest first.
    pub async fn statistic(&self, requester: &Requester, child_id: Uuid) -> Result<Statistic, ServiceError> {
        let principal = require_principal(requester, "getting statistic requires valid authorization")?;

        let child = self.children.find_by_id(child_id).await?;
        let allowed = principal.owns_child(&child) || matches!(principal.role, Role::Admin | Role::Therapist);
        if !allowed {
            return Err(ServiceError::Forbidden(
                "getting statistic for this child must be done either by parent, therapist or admin".to_string(),
            ));
        }

        let mut statistic = Vec::new();
        let mut offset = 0;
        loop {
            let batch = match self
                .results
                .search(ResultFilter {
                    child_id: Some(child_id),
                    limit: STATISTIC_BATCH,
                    offset,
                    ..Default::default()
                })
                .await
            {
                Ok(batch) => batch,
                Err(StorageError::NotFound) if offset == 0 => return Err(ServiceError::not_found()),
                Err(StorageError::NotFound) => break,
                Err(e) => return Err(e.into()),
            };

            let short = (batch.len() as i64) < STATISTIC_BATCH;
            statistic.extend(batch.into_iter().map(|r| StatisticComponent {
                total: total_score(&r.result),
                created_at: r.created_at,
                detail: r.result,
            }));

            if short {
                break;
            }
            offset += STATISTIC_BATCH;
        }

        Ok(Statistic { statistic })
    }
}

fn non_empty_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::BadRequest("name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
