use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use atec_core::models::result::QuestionnaireResult;
use atec_core::principal::Requester;
use atec_service::Page;
use atec_service::package::ActivePackage;
use atec_service::questionnaire::{ResultSearch, SubmitInput, SubmitOutput};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{Envelope, ok};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InitializeQuery {
    #[serde(default)]
    pub package_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ResultSearchQuery {
    #[serde(default)]
    pub result_id: Option<Uuid>,
    #[serde(default)]
    pub package_id: Option<Uuid>,
    #[serde(default)]
    pub child_id: Option<Uuid>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub async fn initialize(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<InitializeQuery>,
) -> Result<Json<Envelope<ActivePackage>>, ApiError> {
    Ok(ok(state.questionnaires.initialize(query.package_id).await?))
}

pub async fn submit(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiJson(input): ApiJson<SubmitInput>,
) -> Result<Json<Envelope<SubmitOutput>>, ApiError> {
    Ok(ok(state.questionnaires.submit(&requester, input).await?))
}

pub async fn download_result(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let png = state.questionnaires.download(&requester, id).await?;
    Ok(([(header::CONTENT_TYPE, atec_export::CONTENT_TYPE)], png))
}

pub async fn search_results(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiQuery(query): ApiQuery<ResultSearchQuery>,
) -> Result<Json<Envelope<Vec<QuestionnaireResult>>>, ApiError> {
    let search = ResultSearch {
        result_id: query.result_id,
        package_id: query.package_id,
        child_id: query.child_id,
        created_by: query.created_by,
    };
    let page = Page::new(query.limit, query.offset);
    Ok(ok(state.questionnaires.search(&requester, search, page).await?))
}

pub async fn my_history(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiQuery(page): ApiQuery<Page>,
) -> Result<Json<Envelope<Vec<QuestionnaireResult>>>, ApiError> {
    Ok(ok(state.questionnaires.user_history(&requester, page).await?))
}
