use axum::extract::State;
use axum::{Extension, Json};
use atec_core::models::package::PackageContent;
use atec_core::principal::Requester;
use atec_service::package::ActivePackage;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::response::{Created, Envelope, Message, ok};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActiveStatusInput {
    pub is_active: bool,
}

pub async fn create_package(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiJson(content): ApiJson<PackageContent>,
) -> Result<Json<Envelope<Created>>, ApiError> {
    let id = state.packages.create(&requester, content).await?;
    Ok(ok(Created { id }))
}

pub async fn update_package(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(content): ApiJson<PackageContent>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    state.packages.update(&requester, id, content).await?;
    Ok(ok(Message::new("ok")))
}

pub async fn change_active_status(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<ActiveStatusInput>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    state.packages.change_active_status(&requester, id, input.is_active).await?;
    Ok(ok(Message::new("ok")))
}

pub async fn delete_package(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    state.packages.delete(&requester, id).await?;
    Ok(ok(Message::new("ok")))
}

pub async fn active_packages(State(state): State<AppState>) -> Result<Json<Envelope<Vec<ActivePackage>>>, ApiError> {
    Ok(ok(state.packages.find_active().await?))
}
