//! The questionnaire orchestrator: initialize, submit, download, search and
//! history.

use std::sync::Arc;
use std::time::Duration;

use atec_core::error::ServiceError;
use atec_core::models::package::IndicationCategory;
use atec_core::models::result::{AnswerDetail, QuestionnaireResult, ResultDetail, total_score};
use atec_core::principal::Requester;
use atec_export::{CardStyle, ResultCard, render_png};
use atec_storage::repository::{ChildRepository, NewResult, ResultFilter, ResultRepository};
use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;
use tracing::{error, info};
use uuid::Uuid;

use crate::access::{require_admin, require_principal};
use crate::package::{ActivePackage, PackageService};
use crate::pagination::Page;

const MARK_LOCKED_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitInput {
    pub package_id: Uuid,
    #[serde(default)]
    pub child_id: Option<Uuid>,
    pub answers: AnswerDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutput {
    pub result_id: Uuid,
    pub package_id: Uuid,
    pub answers: AnswerDetail,
    pub result: ResultDetail,
    pub indication: IndicationCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    pub created_at: jiff::Timestamp,
}

/// Admin filter over stored results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSearch {
    #[serde(default)]
    pub result_id: Option<Uuid>,
    #[serde(default)]
    pub package_id: Option<Uuid>,
    #[serde(default)]
    pub child_id: Option<Uuid>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

#[derive(Clone)]
pub struct QuestionnaireService {
    packages: PackageService,
    results: Arc<dyn ResultRepository>,
    children: Arc<dyn ChildRepository>,
    tracker: TaskTracker,
    card_style: CardStyle,
    mark_locked_timeout: Duration,
}

impl QuestionnaireService {
    pub fn new(
        packages: PackageService,
        results: Arc<dyn ResultRepository>,
        children: Arc<dyn ChildRepository>,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            packages,
            results,
            children,
            tracker,
            card_style: CardStyle::default(),
            mark_locked_timeout: MARK_LOCKED_TIMEOUT,
        }
    }

    pub fn with_card_style(mut self, style: CardStyle) -> Self {
        self.card_style = style;
        self
    }

    /// The tracker holding detached post-submit work.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// The addressed package, or the oldest one that is active and locked.
    pub async fn initialize(&self, package_id: Option<Uuid>) -> Result<ActivePackage, ServiceError> {
        let package = match package_id {
            Some(id) => self.packages.find_by_id(id).await?,
            None => self.packages.find_oldest_active_and_locked().await?,
        };
        Ok(package.into())
    }

    pub async fn submit(&self, requester: &Requester, input: SubmitInput) -> Result<SubmitOutput, ServiceError> {
        atec_grader::ensure_all_questions_answered(&input.answers)
            .map_err(|e| ServiceError::BadRequest(e.to_string()))?;

        let package = self.packages.find_by_id(input.package_id).await?;
        if !package.is_active {
            return Err(ServiceError::BadRequest("questionnaire package is not active".to_string()));
        }

        let detail = atec_grader::grade(&package.questionnaire, &input.answers)
            .map_err(|e| ServiceError::BadRequest(e.to_string()))?;

        let created_by = match input.child_id {
            None => requester.user_id(),
            Some(child_id) => {
                let principal =
                    require_principal(requester, "filling questionnaire for a child requires valid authorization")?;
                let child = self.children.find_by_id(child_id).await?;
                if !principal.is_admin() && !principal.owns_child(&child) {
                    return Err(ServiceError::Forbidden(
                        "filling questionnaire for a child must be done by either the parents or admin".to_string(),
                    ));
                }
                Some(principal.user_id)
            }
        };

        let saved = self
            .results
            .create(
                NewResult {
                    package_id: package.id,
                    child_id: input.child_id,
                    created_by,
                    answer: input.answers,
                    result: detail,
                },
                None,
            )
            .await?;

        if !package.is_locked {
            self.lock_in_background(package.id);
        }

        let indication = package.indication_categories.lookup(total_score(&saved.result));
        info!(result_id = %saved.id, package_id = %package.id, "questionnaire submitted");

        Ok(SubmitOutput {
            result_id: saved.id,
            package_id: saved.package_id,
            answers: saved.answer,
            result: saved.result,
            indication,
            child_id: saved.child_id,
            created_by: saved.created_by,
            created_at: saved.created_at,
        })
    }

    /// Render a stored result as a PNG card.
    pub async fn download(&self, requester: &Requester, result_id: Uuid) -> Result<Vec<u8>, ServiceError> {
        let result = self.results.find_by_id(result_id).await?;

        if result.created_by.is_some() {
            let principal = require_principal(requester, "accessing this result requires authorization")?;
            if !principal.is_admin() && !principal.owns_result(&result) {
                return Err(ServiceError::Unauthorized(
                    "only owner and admin can access this result".to_string(),
                ));
            }
        }

        let package = self.packages.find_by_id(result.package_id).await?;
        let card = ResultCard::build(&result, &package);
        render_png(&card, &self.card_style).map_err(|e| {
            error!(error = %e, result_id = %result_id, "failed to render result card");
            ServiceError::internal()
        })
    }

    pub async fn search(
        &self,
        requester: &Requester,
        search: ResultSearch,
        page: Page,
    ) -> Result<Vec<QuestionnaireResult>, ServiceError> {
        require_admin(requester)?;
        page.validate()?;

        Ok(self
            .results
            .search(ResultFilter {
                id: search.result_id,
                package_id: search.package_id,
                child_id: search.child_id,
                created_by: search.created_by,
                limit: page.limit,
                offset: page.offset,
            })
            .await?)
    }

    pub async fn user_history(&self, requester: &Requester, page: Page) -> Result<Vec<QuestionnaireResult>, ServiceError> {
        let principal = require_principal(requester, "getting user history requires valid authorization")?;
        page.validate()?;

        Ok(self
            .results
            .find_user_history(principal.user_id, page.limit, page.offset)
            .await?)
    }

    fn lock_in_background(&self, package_id: Uuid) {
        let packages = self.packages.clone();
        let deadline = self.mark_locked_timeout;
        self.tracker.spawn(async move {
            match tokio::time::timeout(deadline, packages.mark_locked(package_id)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, package_id = %package_id, "failed to lock package"),
                Err(_) => error!(package_id = %package_id, "locking package timed out"),
            }
        });
    }
}
