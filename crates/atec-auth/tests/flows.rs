use std::sync::{Arc, Mutex};
use std::time::Duration;

use atec_auth::flows::{Credentials, ResetPasswordInput, SignupInput};
use atec_auth::{AuthService, AuthSettings, MailError, Mailer, OutgoingMail, SharedCryptor};
use atec_cache::RateLimiter;
use atec_cache::memory::MemoryBackend;
use atec_core::BoxFuture;
use atec_core::error::ServiceError;
use atec_core::models::user::Role;
use atec_storage::memory::MemoryStore;
use atec_storage::repository::UserRepository;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn last_token(&self, param: &str) -> String {
        let sent = self.sent.lock().unwrap();
        let html = &sent.last().expect("no mail sent").html;
        let rest = html.split(&format!("{param}=")).nth(1).expect("no token in mail");
        rest.split('"').next().unwrap().to_string()
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            if self.fail {
                return Err(MailError::Rejected {
                    status: 500,
                    body: "down".to_string(),
                });
            }
            self.sent.lock().unwrap().push(mail);
            Ok(())
        })
    }
}

struct Harness {
    auth: AuthService,
    store: Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
    cryptor: Arc<SharedCryptor>,
}

fn harness_with(mailer: RecordingMailer) -> Harness {
    build_harness(mailer, 4)
}

fn build_harness(mailer: RecordingMailer, hash_cost: u32) -> Harness {
    let cryptor = Arc::new(SharedCryptor::new(b"key", "000102030405060708090a0b0c0d0e0f", hash_cost).unwrap());
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(mailer);
    let auth = AuthService::new(
        cryptor.clone(),
        store.clone(),
        store.clone(),
        mailer.clone(),
        RateLimiter::new(Arc::new(MemoryBackend::new())),
        AuthSettings {
            resend_verification_window: Duration::from_secs(120),
            ..AuthSettings::default()
        },
    );
    Harness {
        auth,
        store,
        mailer,
        cryptor,
    }
}

fn harness() -> Harness {
    harness_with(RecordingMailer::default())
}

fn signup_input() -> SignupInput {
    SignupInput {
        email: "parent@example.com".to_string(),
        password: "password123".to_string(),
        username: "parent".to_string(),
    }
}

fn credentials(password: &str) -> Credentials {
    Credentials {
        email: "parent@example.com".to_string(),
        password: password.to_string(),
    }
}

async fn active_account(h: &Harness) {
    h.auth.signup(signup_input()).await.unwrap();
    let token = h.mailer.last_token("validation_token");
    h.auth.verify_account(&token).await.unwrap();
}

#[tokio::test]
async fn signup_stores_encrypted_email_and_inactive_user() {
    let h = harness();
    assert_eq!(h.auth.signup(signup_input()).await.unwrap(), "email confirmation sent");

    let ciphertext = h.cryptor.encrypt("parent@example.com").unwrap();
    let user = h.store.find_by_email(&ciphertext).await.unwrap();
    assert!(!user.is_active);
    assert_eq!(user.role, Role::User);
    assert_ne!(user.email, "parent@example.com");
    assert_ne!(user.password, "password123");
    assert_eq!(h.mailer.count(), 1);
}

#[tokio::test]
async fn signup_rejects_taken_email() {
    let h = harness();
    h.auth.signup(signup_input()).await.unwrap();
    let err = h.auth.signup(signup_input()).await.unwrap_err();
    assert_eq!(
        err,
        ServiceError::BadRequest("your email has been used by another account".to_string())
    );
}

#[tokio::test]
async fn signup_validates_input() {
    let h = harness();
    let mut input = signup_input();
    input.password = "short".to_string();
    assert!(matches!(h.auth.signup(input).await, Err(ServiceError::BadRequest(_))));

    let mut input = signup_input();
    input.email = "not-an-email".to_string();
    assert!(matches!(h.auth.signup(input).await, Err(ServiceError::BadRequest(_))));
}

#[tokio::test]
async fn failed_mail_rolls_back_signup() {
    let h = harness_with(RecordingMailer::failing());
    let err = h.auth.signup(signup_input()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Internal(_)));

    let ciphertext = h.cryptor.encrypt("parent@example.com").unwrap();
    assert!(h.store.find_by_email(&ciphertext).await.is_err());
}

#[tokio::test]
async fn login_requires_activation_then_issues_token() {
    let h = harness();
    h.auth.signup(signup_input()).await.unwrap();

    let err = h.auth.login(credentials("password123")).await.unwrap_err();
    assert_eq!(err, ServiceError::Unauthorized("this account still not activated".to_string()));

    let token = h.mailer.last_token("validation_token");
    assert_eq!(h.auth.verify_account(&token).await.unwrap(), "your account has been activated");
    // Verifying twice is harmless.
    h.auth.verify_account(&token).await.unwrap();

    let login = h.auth.login(credentials("password123")).await.unwrap();
    let principal = h.auth.authenticate(&login).unwrap();
    assert_eq!(principal.role, Role::User);

    let err = h.auth.login(credentials("wrongpassword")).await.unwrap_err();
    assert_eq!(err, ServiceError::Unauthorized("invalid password".to_string()));
}

#[tokio::test]
async fn login_for_unknown_email_is_not_found() {
    let h = harness();
    assert!(matches!(
        h.auth.login(credentials("password123")).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn verification_token_cannot_authenticate_requests() {
    let h = harness();
    h.auth.signup(signup_input()).await.unwrap();
    let token = h.mailer.last_token("validation_token");
    assert!(matches!(h.auth.authenticate(&token), Err(ServiceError::Unauthorized(_))));
    assert!(matches!(
        h.auth.verify_account("garbage").await,
        Err(ServiceError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn password_reset_flow_changes_the_password() {
    let h = harness();
    active_account(&h).await;

    assert_eq!(h.auth.init_reset_password("parent@example.com").await.unwrap(), "ok");
    let token = h.mailer.last_token("change_password_token");
    h.auth
        .reset_password(ResetPasswordInput {
            token,
            new_password: "new-password".to_string(),
        })
        .await
        .unwrap();

    assert!(h.auth.login(credentials("password123")).await.is_err());
    h.auth.login(credentials("new-password")).await.unwrap();
}

#[tokio::test]
async fn reset_of_inactive_account_is_refused() {
    let h = harness();
    h.auth.signup(signup_input()).await.unwrap();
    assert!(matches!(
        h.auth.init_reset_password("parent@example.com").await,
        Err(ServiceError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn resend_is_rate_limited_per_address() {
    let h = harness();
    h.auth.signup(signup_input()).await.unwrap();

    h.auth.resend_verification("parent@example.com").await.unwrap();
    let err = h.auth.resend_verification("parent@example.com").await.unwrap_err();
    match err {
        ServiceError::TooManyRequests(msg) => assert!(msg.starts_with("please retry again after ")),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(h.mailer.count(), 2);
}

#[tokio::test]
async fn resend_for_active_account_is_bad_request() {
    let h = harness();
    active_account(&h).await;
    let err = h.auth.resend_verification("parent@example.com").await.unwrap_err();
    assert_eq!(err, ServiceError::BadRequest("this account has been activated".to_string()));
}

#[tokio::test]
async fn delete_account_requires_the_password() {
    let h = harness();
    active_account(&h).await;

    assert!(matches!(
        h.auth.delete_account(credentials("wrongpassword")).await,
        Err(ServiceError::Unauthorized(_))
    ));
    h.auth.delete_account(credentials("password123")).await.unwrap();
    assert!(matches!(
        h.auth.login(credentials("password123")).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn admin_bootstrap_is_idempotent() {
    let h = harness();
    h.auth
        .init_admin_account("admin@example.com", "adminpassword", "admin")
        .await
        .unwrap();
    h.auth
        .init_admin_account("admin@example.com", "adminpassword", "admin")
        .await
        .unwrap();

    let token = h
        .auth
        .login(Credentials {
            email: "admin@example.com".to_string(),
            password: "adminpassword".to_string(),
        })
        .await
        .unwrap();
    assert!(h.auth.authenticate(&token).unwrap().is_admin());
}

#[tokio::test(flavor = "current_thread")]
async fn password_hashing_leaves_the_runtime_free() {
    let h = build_harness(RecordingMailer::default(), 12);
    let seeding = h.auth.init_admin_account("admin@example.com", "password123", "admin");
    tokio::pin!(seeding);

    // a cost-12 hash takes far longer than the timer
    let early = tokio::time::timeout(Duration::from_millis(10), &mut seeding).await;
    assert!(early.is_err());

    seeding.await.unwrap();
    let email = h.cryptor.encrypt("admin@example.com").unwrap();
    let admin = h.store.find_by_email(&email).await.unwrap();
    assert_eq!(admin.role, Role::Admin);
}
