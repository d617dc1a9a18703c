use std::net::SocketAddr;
use std::sync::Arc;

use atec_auth::{LogMailer, SharedCryptor};
use atec_core::models::user::Role;
use atec_grader::default_package::default_content;
use atec_server::config::AppConfig;
use atec_server::state::{AppState, Backends};
use atec_storage::repository::{NewUser, UserRepository};
use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tokio_util::task::TaskTracker;
use tower::ServiceExt;

const PASSWORD: &str = "correct horse";

struct TestApp {
    router: Router,
    users: Arc<dyn UserRepository>,
    cryptor: Arc<SharedCryptor>,
    state: AppState,
}

fn test_config(submit_per_minute: u64, trusted_proxies: &[&str]) -> AppConfig {
    serde_json::from_value(json!({
        "postgres": { "dsn": "postgres://unused" },
        "crypto": { "private_key_path": "unused", "iv_hex": "000102030405060708090a0b0c0d0e0f" },
        "redis": { "cache": { "url": "redis://unused" }, "lock": { "url": "redis://unused" } },
        "rate_limit": { "submit_per_minute": submit_per_minute, "trusted_proxies": trusted_proxies }
    }))
    .unwrap()
}

fn test_app(submit_per_minute: u64) -> TestApp {
    app_with(test_config(submit_per_minute, &[]))
}

fn app_with(config: AppConfig) -> TestApp {
    let cryptor = Arc::new(SharedCryptor::new(b"router-tests", &config.crypto.iv_hex, 4).unwrap());
    let backends = Backends::in_memory(Arc::new(LogMailer));
    let users = backends.users.clone();
    let state = AppState::new(&config, cryptor.clone(), backends, TaskTracker::new());
    TestApp {
        router: atec_server::app(state.clone()),
        users,
        cryptor,
        state,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec(), content_type)
    }

    async fn json(&self, req: Request<Body>) -> (StatusCode, Value) {
        let (status, body, _) = self.send(req).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn user(&self, email: &str, role: Role) {
        self.users
            .create(
                NewUser {
                    email: self.cryptor.encrypt(email).unwrap(),
                    password: self.cryptor.hash_password(PASSWORD).unwrap(),
                    username: "tester".to_string(),
                    is_active: true,
                    role,
                },
                None,
            )
            .await
            .unwrap();
    }

    async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .json(post_json("/v1/auth/login", None, json!({ "email": email, "password": PASSWORD })))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request("GET", uri, token, None)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    request("POST", uri, token, Some(body))
}

fn zero_answers() -> Value {
    let counts = [(0, 14), (1, 20), (2, 18), (3, 25)];
    let mut answers = serde_json::Map::new();
    for (subtest, count) in counts {
        let group: serde_json::Map<String, Value> = (0..count).map(|q| (q.to_string(), json!(0))).collect();
        answers.insert(subtest.to_string(), Value::Object(group));
    }
    Value::Object(answers)
}

async fn active_package(app: &TestApp, admin_token: &str) -> String {
    let (status, body) = app
        .json(post_json("/v1/atec/packages", Some(admin_token), json!(default_content())))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .json(request(
            "PATCH",
            &format!("/v1/atec/packages/{id}"),
            Some(admin_token),
            Some(json!({ "is_active": true })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    id
}

#[tokio::test]
async fn ping_answers_pong() {
    let app = test_app(10);
    let (status, body) = app.json(get("/ping", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "pong" }));
}

#[tokio::test]
async fn errors_use_the_envelope() {
    let app = test_app(10);
    let (status, body) = app.json(get("/v1/atec/packages/active", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status_code"], 404);
    assert_eq!(body["error_code"], "Not Found");
    assert_eq!(
        body["error_message"],
        "system still doesn't have any questionnaire to be used yet"
    );
}

#[tokio::test]
async fn protected_routes_need_a_bare_token() {
    let app = test_app(10);
    app.user("parent@example.com", Role::Parent).await;
    let token = app.login("parent@example.com").await;

    let (status, body) = app.json(get("/v1/users/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_message"], "missing required auth token");

    let bearer = format!("Bearer {token}");
    let (status, _) = app.json(get("/v1/users/me", Some(&bearer))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.json(get("/v1/users/me", Some("not-a-token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let padded = format!("  {token} ");
    let (status, body) = app.json(get("/v1/users/me", Some(&padded))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "OK");
    assert_eq!(body["data"]["email"], "parent@example.com");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = test_app(10);
    app.user("someone@example.com", Role::User).await;

    let (status, body) = app
        .json(post_json(
            "/v1/auth/login",
            None,
            json!({ "email": "someone@example.com", "password": "not the password" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let app = test_app(10);
    let req = Request::builder()
        .method("POST")
        .uri("/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = app.json(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "Bad Request");
    assert_eq!(body["error_message"], "failed to parse input");
}

#[tokio::test]
async fn package_writes_are_admin_only() {
    let app = test_app(10);
    app.user("parent@example.com", Role::Parent).await;
    let token = app.login("parent@example.com").await;

    let (status, _) = app
        .json(post_json("/v1/atec/packages", Some(&token), json!(default_content())))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .json(request("DELETE", "/v1/atec/packages/not-a-uuid", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn anonymous_submit_and_download() {
    let app = test_app(10);
    app.user("admin@example.com", Role::Admin).await;
    let admin = app.login("admin@example.com").await;
    let package_id = active_package(&app, &admin).await;

    let (status, body) = app
        .json(post_json(
            "/v1/atec/questionnaires",
            Some("garbage token"),
            json!({ "package_id": package_id, "answers": zero_answers() }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["indication"]["name"], "mild");
    assert!(body["data"].get("created_by").is_none());
    let result_id = body["data"]["result_id"].as_str().unwrap().to_string();

    let (status, png, content_type) = app
        .send(get(&format!("/v1/atec/questionnaires/results/{result_id}"), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);

    app.state.questionnaires.tracker().close();
    app.state.questionnaires.tracker().wait().await;
    let (status, _) = app
        .json(request(
            "DELETE",
            &format!("/v1/atec/packages/{package_id}"),
            Some(&admin),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn owned_results_need_the_owner() {
    let app = test_app(10);
    app.user("admin@example.com", Role::Admin).await;
    app.user("owner@example.com", Role::User).await;
    app.user("other@example.com", Role::User).await;
    let admin = app.login("admin@example.com").await;
    let owner = app.login("owner@example.com").await;
    let other = app.login("other@example.com").await;
    let package_id = active_package(&app, &admin).await;

    let (_, body) = app
        .json(post_json(
            "/v1/atec/questionnaires",
            Some(&owner),
            json!({ "package_id": package_id, "answers": zero_answers() }),
        ))
        .await;
    let uri = format!("/v1/atec/questionnaires/results/{}", body["data"]["result_id"].as_str().unwrap());

    assert_eq!(app.send(get(&uri, None)).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.send(get(&uri, Some(&other))).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.send(get(&uri, Some(&owner))).await.0, StatusCode::OK);
    assert_eq!(app.send(get(&uri, Some(&admin))).await.0, StatusCode::OK);

    let (status, body) = app.json(get("/v1/atec/questionnaires/results/my?limit=10", Some(&owner))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

/// A submission arriving from `peer`, optionally carrying `X-Forwarded-For`.
fn submission_from(submission: &Value, peer: &str, forwarded: Option<&str>) -> Request<Body> {
    let mut req = post_json("/v1/atec/questionnaires", None, submission.clone());
    let addr = SocketAddr::new(peer.parse().unwrap(), 40_000);
    req.extensions_mut().insert(ConnectInfo(addr));
    if let Some(forwarded) = forwarded {
        req.headers_mut().insert("x-forwarded-for", forwarded.parse().unwrap());
    }
    req
}

async fn submission_for(app: &TestApp) -> Value {
    app.user("admin@example.com", Role::Admin).await;
    let admin = app.login("admin@example.com").await;
    let package_id = active_package(app, &admin).await;
    json!({ "package_id": package_id, "answers": zero_answers() })
}

#[tokio::test]
async fn submissions_are_rate_limited_per_caller() {
    let app = test_app(1);
    let submission = submission_for(&app).await;

    assert_eq!(app.json(submission_from(&submission, "10.0.0.1", None)).await.0, StatusCode::OK);
    let (status, body) = app.json(submission_from(&submission, "10.0.0.1", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["status_code"], 429);
    assert_eq!(app.json(submission_from(&submission, "10.0.0.2", None)).await.0, StatusCode::OK);
}

#[tokio::test]
async fn forwarded_header_is_ignored_from_untrusted_peers() {
    let app = test_app(1);
    let submission = submission_for(&app).await;

    let first = submission_from(&submission, "10.0.0.1", Some("203.0.113.1"));
    assert_eq!(app.json(first).await.0, StatusCode::OK);
    let rotated = submission_from(&submission, "10.0.0.1", Some("203.0.113.2"));
    assert_eq!(app.json(rotated).await.0, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn trusted_proxy_forwards_the_client_address() {
    let app = app_with(test_config(1, &["127.0.0.1"]));
    let submission = submission_for(&app).await;

    let first = submission_from(&submission, "127.0.0.1", Some("203.0.113.1"));
    assert_eq!(app.json(first).await.0, StatusCode::OK);
    let again = submission_from(&submission, "127.0.0.1", Some("198.51.100.7, 203.0.113.1"));
    assert_eq!(app.json(again).await.0, StatusCode::TOO_MANY_REQUESTS);
    let other = submission_from(&submission, "127.0.0.1", Some("203.0.113.2"));
    assert_eq!(app.json(other).await.0, StatusCode::OK);
}

#[tokio::test]
async fn children_routes_round_trip() {
    let app = test_app(10);
    app.user("parent@example.com", Role::Parent).await;
    app.user("therapist@example.com", Role::Therapist).await;
    let parent = app.login("parent@example.com").await;
    let therapist = app.login("therapist@example.com").await;

    let (status, body) = app
        .json(post_json(
            "/v1/children",
            Some(&parent),
            json!({ "date_of_birth": "2019-03-04", "gender": true, "name": "Ann" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = app.json(get("/v1/children?limit=5", Some(&parent))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Ann");
    assert_eq!(body["data"][0]["parent_username"], "tester");

    let (status, _) = app.json(get("/v1/children/search?limit=5&gender=true", Some(&parent))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.json(get("/v1/children/search?limit=5&gender=true", Some(&therapist))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.json(get("/v1/children?limit=500", Some(&parent))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
