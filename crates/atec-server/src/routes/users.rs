use axum::extract::State;
use axum::{Extension, Json};
use atec_core::principal::Requester;
use atec_service::users::{Profile, Therapist, UpdateProfileInput};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::response::{Envelope, Message, ok};
use crate::state::AppState;

pub async fn my_profile(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> Result<Json<Envelope<Profile>>, ApiError> {
    Ok(ok(state.users.profile(&requester).await?))
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiJson(input): ApiJson<UpdateProfileInput>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    state.users.update_profile(&requester, input).await?;
    Ok(ok(Message::new("ok")))
}

pub async fn therapists(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> Result<Json<Envelope<Vec<Therapist>>>, ApiError> {
    Ok(ok(state.users.therapists(&requester).await?))
}
