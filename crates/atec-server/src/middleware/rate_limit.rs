use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use atec_core::cache_keys;
use atec_core::error::ServiceError;
use atec_core::principal::Requester;

use crate::error::ApiError;
use crate::state::AppState;

/// Throttles questionnaire submissions per caller. Runs after
/// [`optional_auth`](super::auth::optional_auth).
pub async fn limit_submissions(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let caller = caller_key(&req, &state.trusted_proxies);

    match state.limiter.allow(&cache_keys::submit_questionnaire(&caller), state.submit_limit).await {
        Ok(decision) if decision.allowed => next.run(req).await,
        Ok(decision) => {
            let secs = decision.retry_after.as_secs().max(1);
            let mut response = ApiError(ServiceError::TooManyRequests(format!(
                "too many submissions, please retry again after {secs}s"
            )))
            .into_response();
            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from(secs));
            response
        }
        Err(e) => {
            // fail open
            tracing::warn!(error = %e, caller = %caller, "rate limiter unavailable, letting request through");
            next.run(req).await
        }
    }
}

/// User id when signed in, else the client address. `X-Forwarded-For` is
/// only read when the socket peer is a trusted proxy; the client is the
/// rightmost hop that is not itself a trusted proxy.
fn caller_key(req: &Request, trusted_proxies: &[IpAddr]) -> String {
    if let Some(user_id) = req.extensions().get::<Requester>().and_then(Requester::user_id) {
        return format!("user:{user_id}");
    }

    let Some(peer) = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip()) else {
        return "addr:unknown".to_string();
    };
    if !trusted_proxies.contains(&peer) {
        return format!("addr:{peer}");
    }

    let client = req
        .headers()
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .find(|hop| !trusted_proxies.contains(hop))
        .unwrap_or(peer);
    format!("addr:{client}")
}
