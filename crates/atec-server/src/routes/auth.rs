use axum::Json;
use axum::extract::State;
use atec_auth::flows::{Credentials, ResetPasswordInput, SignupInput};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response::{Envelope, Message, ok};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailInput {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub validation_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginOutput {
    pub token: String,
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SignupInput>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    let message = state.auth.signup(input).await?;
    Ok(ok(Message::new(message)))
}

pub async fn resend_verification(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<EmailInput>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    let message = state.auth.resend_verification(&input.email).await?;
    Ok(ok(Message::new(message)))
}

pub async fn verify_account(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VerifyQuery>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    let message = state.auth.verify_account(&query.validation_token).await?;
    Ok(ok(Message::new(message)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<Credentials>,
) -> Result<Json<Envelope<LoginOutput>>, ApiError> {
    let token = state.auth.login(input).await?;
    Ok(ok(LoginOutput { token }))
}

pub async fn init_reset_password(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<EmailInput>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    let message = state.auth.init_reset_password(&input.email).await?;
    Ok(ok(Message::new(message)))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ResetPasswordInput>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    let message = state.auth.reset_password(input).await?;
    Ok(ok(Message::new(message)))
}

pub async fn delete_account(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<Credentials>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    state.auth.delete_account(input).await?;
    Ok(ok(Message::new("account deleted")))
}
