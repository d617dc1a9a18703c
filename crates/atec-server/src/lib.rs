//! atec-server
//!
//! HTTP/JSON surface of the questionnaire service. Everything under `/v1`
//! answers with the success or error envelope; the result card download
//! answers with `image/png`.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};

use state::AppState;

pub fn app(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/signup", post(routes::auth::signup))
        .route("/auth/signup/resend", post(routes::auth::resend_verification))
        .route("/auth/verify", get(routes::auth::verify_account))
        .route("/auth/login", post(routes::auth::login))
        .route(
            "/auth/password",
            post(routes::auth::reset_password).patch(routes::auth::init_reset_password),
        )
        .route("/auth/account", delete(routes::auth::delete_account))
        .route("/atec/packages/active", get(routes::packages::active_packages))
        .route("/atec/questionnaires", get(routes::questionnaires::initialize));

    // Anonymous callers welcome; a valid token identifies the caller.
    let optional = Router::new()
        .route(
            "/atec/questionnaires",
            post(routes::questionnaires::submit).route_layer(from_fn_with_state(
                state.clone(),
                middleware::rate_limit::limit_submissions,
            )),
        )
        .route(
            "/atec/questionnaires/results/{id}",
            get(routes::questionnaires::download_result),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::auth::optional_auth));

    let protected = Router::new()
        .route(
            "/users/me",
            get(routes::users::my_profile).put(routes::users::update_my_profile),
        )
        .route("/users/therapists", get(routes::users::therapists))
        .route("/atec/packages", post(routes::packages::create_package))
        .route(
            "/atec/packages/{id}",
            put(routes::packages::update_package)
                .patch(routes::packages::change_active_status)
                .delete(routes::packages::delete_package),
        )
        .route(
            "/children",
            post(routes::children::register_child).get(routes::children::my_children),
        )
        .route("/children/search", get(routes::children::search_children))
        .route("/children/{id}", put(routes::children::update_child))
        .route("/children/{id}/stats", get(routes::children::child_statistic))
        .route("/atec/questionnaires/results", get(routes::questionnaires::search_results))
        .route("/atec/questionnaires/results/my", get(routes::questionnaires::my_history))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth::require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(routes::health::ping))
        .nest("/v1", public.merge(optional).merge(protected))
        .layer(from_fn(middleware::audit::audit_log))
        .layer(cors)
        .with_state(state)
}
