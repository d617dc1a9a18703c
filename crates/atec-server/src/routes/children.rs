use axum::extract::State;
use axum::{Extension, Json};
use atec_core::models::child::Child;
use atec_core::principal::Requester;
use atec_service::Page;
use atec_service::child::{ChildSearch, RegisterChildInput, RegisteredChild, Statistic, UpdateChildInput};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{Created, Envelope, Message, ok};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChildSearchQuery {
    #[serde(default)]
    pub parent_user_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<bool>,
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub async fn register_child(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiJson(input): ApiJson<RegisterChildInput>,
) -> Result<Json<Envelope<Created>>, ApiError> {
    let id = state.children.register(&requester, input).await?;
    Ok(ok(Created { id }))
}

pub async fn update_child(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateChildInput>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    state.children.update(&requester, id, input).await?;
    Ok(ok(Message::new("ok")))
}

pub async fn my_children(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiQuery(page): ApiQuery<Page>,
) -> Result<Json<Envelope<Vec<RegisteredChild>>>, ApiError> {
    Ok(ok(state.children.registered(&requester, page).await?))
}

pub async fn search_children(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiQuery(query): ApiQuery<ChildSearchQuery>,
) -> Result<Json<Envelope<Vec<Child>>>, ApiError> {
    let search = ChildSearch {
        parent_user_id: query.parent_user_id,
        name: query.name,
        gender: query.gender,
    };
    let page = Page::new(query.limit, query.offset);
    Ok(ok(state.children.search(&requester, search, page).await?))
}

pub async fn child_statistic(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Envelope<Statistic>>, ApiError> {
    Ok(ok(state.children.statistic(&requester, id).await?))
}
