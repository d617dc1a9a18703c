//! Token authentication.
//!
//! The `Authorization` header carries the bare login token: the whole value,
//! trimmed, must be a single word. Handlers read the resulting
//! [`Requester`] from the request extensions.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use atec_core::error::ServiceError;
use atec_core::principal::Requester;

use crate::error::ApiError;
use crate::state::AppState;

pub const MSG_MISSING_TOKEN: &str = "missing required auth token";

/// The token from the header, if it is well formed.
pub fn access_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    if value.is_empty() || value.contains(char::is_whitespace) {
        return None;
    }
    Some(value)
}

/// Rejects the request unless it carries a valid login token.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(token) = access_token(req.headers()) else {
        return ApiError(ServiceError::Unauthorized(MSG_MISSING_TOKEN.to_string())).into_response();
    };

    match state.auth.authenticate(token) {
        Ok(principal) => {
            req.extensions_mut().insert(Requester::Authenticated(principal));
            next.run(req).await
        }
        Err(e) => ApiError(e).into_response(),
    }
}

/// Resolves the caller when possible; anything else proceeds anonymously.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let requester = match access_token(req.headers()) {
        None => Requester::Anonymous,
        Some(token) => match state.auth.authenticate(token) {
            Ok(principal) => Requester::Authenticated(principal),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring invalid token on optional route");
                Requester::Anonymous
            }
        },
    };

    req.extensions_mut().insert(requester);
    next.run(req).await
}
